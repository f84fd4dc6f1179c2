use serde::{Deserialize, Serialize};

use tempo_core::{Task, TaskCategory};

/// Per-category slice of the statistics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub total: usize,
    pub completed: usize,
    pub time_spent: u64,
}

/// The three category slices, one per `TaskCategory` variant.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub work: CategoryStats,
    pub study: CategoryStats,
    pub leisure: CategoryStats,
}

impl CategoryBreakdown {
    pub fn get(&self, category: TaskCategory) -> &CategoryStats {
        match category {
            TaskCategory::Work => &self.work,
            TaskCategory::Study => &self.study,
            TaskCategory::Leisure => &self.leisure,
        }
    }

    fn get_mut(&mut self, category: TaskCategory) -> &mut CategoryStats {
        match category {
            TaskCategory::Work => &mut self.work,
            TaskCategory::Study => &mut self.study,
            TaskCategory::Leisure => &mut self.leisure,
        }
    }
}

/// Aggregate productivity metrics, derived on demand from the task
/// collection. Pure data; computing it never touches tracker state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductivityStats {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    /// Percent completed, 0.0 for an empty collection.
    pub completion_rate: f64,
    /// Minutes across all tasks, completed or not.
    pub total_time_spent: u64,
    /// Minutes per completed task, 0.0 when nothing is completed yet.
    pub average_time_per_task: f64,
    pub categories: CategoryBreakdown,
}

impl ProductivityStats {
    pub fn compute(tasks: &[Task]) -> Self {
        let total_tasks = tasks.len();
        let completed_tasks = tasks.iter().filter(|t| t.completed).count();
        let total_time_spent: u64 = tasks.iter().map(|t| t.time_spent).sum();

        let completion_rate = if total_tasks > 0 {
            completed_tasks as f64 / total_tasks as f64 * 100.0
        } else {
            0.0
        };
        let average_time_per_task = if completed_tasks > 0 {
            total_time_spent as f64 / completed_tasks as f64
        } else {
            0.0
        };

        let mut categories = CategoryBreakdown::default();
        for task in tasks {
            let slice = categories.get_mut(task.category);
            slice.total += 1;
            slice.time_spent += task.time_spent;
            if task.completed {
                slice.completed += 1;
            }
        }

        Self {
            total_tasks,
            completed_tasks,
            completion_rate,
            total_time_spent,
            average_time_per_task,
            categories,
        }
    }
}
