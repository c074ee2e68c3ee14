use std::path::Path;

use time::{Date, Duration, macros::date};
use yachtcrm::store::{NewProject, NewYachtModel, ProjectStore};

/// One project to seed, with its related-row counts.
#[derive(Debug, Clone)]
pub struct ProjectSeed {
    pub name: String,
    pub length_m: Option<f64>,
    pub base_price: f64,
    pub tasks: u32,
    pub change_requests: u32,
    pub interactions: u32,
    pub planned_start: Date,
    pub planned_end: Date,
    /// Days past the planned end; `None` keeps the project active.
    pub delay_days: Option<i64>,
    pub feedback: Vec<i64>,
}

impl ProjectSeed {
    pub fn completed(name: &str, change_requests: u32, delay_days: i64) -> Self {
        Self {
            delay_days: Some(delay_days),
            ..Self::active(name, change_requests)
        }
    }

    pub fn active(name: &str, change_requests: u32) -> Self {
        Self {
            name: name.to_string(),
            length_m: Some(30.0),
            base_price: 1_200_000.0,
            tasks: 40,
            change_requests,
            interactions: 12,
            planned_start: date!(2024 - 02 - 01),
            planned_end: date!(2024 - 11 - 30),
            delay_days: None,
            feedback: Vec::new(),
        }
    }
}

/// A project store with one customer that owns every seeded project.
pub struct FixtureDb {
    pub store: ProjectStore,
    customer_id: i64,
}

impl FixtureDb {
    pub fn in_memory() -> Self {
        Self::wrap(ProjectStore::open_in_memory().expect("open in-memory store"))
    }

    pub fn at(path: &Path) -> Self {
        Self::wrap(ProjectStore::open(path).expect("open file store"))
    }

    fn wrap(store: ProjectStore) -> Self {
        let customer_id = store.insert_customer("Harbour Holdings").expect("customer");
        Self { store, customer_id }
    }

    pub fn add(&self, seed: &ProjectSeed) -> i64 {
        let yacht_model_id = seed.length_m.map(|length_m| {
            self.store
                .insert_yacht_model(&NewYachtModel {
                    name: format!("{} hull", seed.name),
                    length_m,
                    base_price: seed.base_price,
                })
                .expect("yacht model")
        });
        let actual_end = seed
            .delay_days
            .map(|days| seed.planned_end + Duration::days(days));
        let id = self
            .store
            .insert_project(&NewProject {
                customer_id: self.customer_id,
                yacht_model_id,
                name: seed.name.clone(),
                status: if actual_end.is_some() {
                    "Completed"
                } else {
                    "InProgress"
                }
                .to_string(),
                planned_start: seed.planned_start,
                planned_end: seed.planned_end,
                actual_start: Some(seed.planned_start),
                actual_end,
            })
            .expect("project");
        self.store.add_tasks(id, seed.tasks).expect("tasks");
        self.store
            .add_change_requests(id, seed.change_requests)
            .expect("change requests");
        self.store
            .add_interactions(id, seed.interactions)
            .expect("interactions");
        for &score in &seed.feedback {
            self.store
                .add_feedback(self.customer_id, Some(id), score)
                .expect("feedback");
        }
        id
    }

    /// Completed projects whose delay grows with change requests.
    pub fn seed_history(&self, count: u32) -> Vec<i64> {
        (0..count)
            .map(|i| {
                let changes = i % 8;
                let mut seed = ProjectSeed::completed(
                    &format!("History {i}"),
                    changes,
                    changes as i64 * 5 - 4,
                );
                seed.length_m = Some(18.0 + (i % 5) as f64 * 6.0);
                self.add(&seed)
            })
            .collect()
    }
}
