//! Seed catalog for a fresh install: an AI research center's shared
//! equipment, staff and rooms, plus the house rules for combining them.

use crate::engine::{Constraint, Registries};
use crate::model::*;

use ResourceCategory::*;

fn resource(
    id: &str,
    name: &str,
    category: ResourceCategory,
    capacity: u32,
    attributes: &[(&str, &str)],
) -> Resource {
    Resource {
        id: ResourceId::new(id),
        name: name.into(),
        category,
        capacity,
        attributes: attributes
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

pub fn default_resources() -> Vec<Resource> {
    vec![
        // Computational
        resource(
            "gpu_cluster_a100",
            "GPU Cluster A100 (8x NVIDIA A100)",
            Computational,
            1,
            &[
                ("gpu_memory", "320GB"),
                ("cpus", "2x AMD EPYC"),
                ("ram", "512GB"),
                ("storage", "50TB NVMe"),
                ("power_draw", "6.5kW"),
            ],
        ),
        resource(
            "gpu_cluster_v100",
            "GPU Cluster V100 (4x NVIDIA V100)",
            Computational,
            1,
            &[
                ("gpu_memory", "128GB"),
                ("cpus", "2x Intel Xeon"),
                ("ram", "256GB"),
                ("storage", "20TB SSD"),
                ("power_draw", "3.2kW"),
            ],
        ),
        resource(
            "cpu_server",
            "High-Memory CPU Server",
            Computational,
            2,
            &[
                ("cpus", "2x AMD EPYC 7742"),
                ("ram", "1TB"),
                ("storage", "100TB HDD"),
                ("cores", "128"),
            ],
        ),
        resource(
            "workstation",
            "RTX 4090 Workstation",
            Computational,
            4,
            &[
                ("gpu", "NVIDIA RTX 4090"),
                ("ram", "64GB"),
                ("storage", "4TB NVMe"),
            ],
        ),
        resource(
            "external_server",
            "External Cloud Server",
            Computational,
            2,
            &[
                ("provider", "AWS EC2 P4d"),
                ("gpu", "8x NVIDIA A100"),
                ("region", "us-east-1"),
                ("access", "dedicated VPN"),
            ],
        ),
        // Equipment
        resource(
            "learning_robot",
            "Reinforcement Learning Robot",
            Equipment,
            1,
            &[
                ("kind", "6-DOF manipulator"),
                ("sensors", "RGB-D, LiDAR, tactile"),
                ("controller", "NVIDIA Jetson AGX"),
                ("floor_space", "16m2"),
            ],
        ),
        // Human
        resource(
            "vision_researcher",
            "Senior Researcher, Computer Vision",
            Human,
            1,
            &[
                ("speciality", "computer vision"),
                ("experience", "5+ years"),
            ],
        ),
        resource(
            "nlp_researcher",
            "Senior Researcher, NLP",
            Human,
            1,
            &[
                ("speciality", "natural language processing"),
                ("experience", "4+ years"),
            ],
        ),
        resource(
            "mlops_engineer",
            "MLOps Engineer",
            Human,
            2,
            &[
                ("speciality", "MLOps and DevOps"),
                ("experience", "3+ years"),
            ],
        ),
        resource(
            "data_scientist",
            "Data Scientist",
            Human,
            3,
            &[
                ("speciality", "data science"),
                ("experience", "2+ years"),
            ],
        ),
        // Space
        resource(
            "sensitive_data_lab",
            "Sensitive Data Lab",
            Space,
            1,
            &[
                ("seats", "4"),
                ("security_level", "3"),
            ],
        ),
        resource(
            "server_room",
            "Server Room",
            Space,
            1,
            &[
                ("seats", "2"),
                ("climate_controlled", "true"),
            ],
        ),
        resource(
            "meeting_room",
            "Main Meeting Room",
            Space,
            1,
            &[
                ("seats", "12"),
                ("equipment", "4K projector, video conferencing"),
            ],
        ),
        resource(
            "prototyping_lab",
            "Prototyping Lab",
            Space,
            1,
            &[
                ("seats", "6"),
                ("equipment", "3D printers, IoT sensors"),
            ],
        ),
    ]
}

pub fn default_constraints() -> Vec<Constraint> {
    let co = |principal: &str, dependent: &str| Constraint::CoRequisite {
        principal: ResourceId::new(principal),
        dependent: ResourceId::new(dependent),
    };
    let excl = |a: &str, b: &str| Constraint::MutualExclusion {
        a: ResourceId::new(a),
        b: ResourceId::new(b),
    };
    vec![
        co("gpu_cluster_a100", "vision_researcher"),
        co("sensitive_data_lab", "data_scientist"),
        co("server_room", "mlops_engineer"),
        // Compliance: sensitive data never leaves the building.
        excl("sensitive_data_lab", "external_server"),
        // Power and cooling budget.
        excl("gpu_cluster_a100", "gpu_cluster_v100"),
        // Electromagnetic interference.
        excl("server_room", "prototyping_lab"),
        excl("learning_robot", "meeting_room"),
        Constraint::CapacityLimit { category: Human, max: 4 },
        Constraint::CapacityLimit { category: Computational, max: 2 },
        Constraint::CapacityLimit { category: Space, max: 1 },
    ]
}

/// Catalog plus rules, no events.
pub fn default_registries() -> Registries {
    let mut reg = Registries::default();
    for r in default_resources() {
        reg.resources.add(r);
    }
    reg.constraints = default_constraints();
    reg
}
