//! Heuristic advice derived from the statistics. Rules are ordered and
//! non-exclusive; every rule that fires contributes its message.

use tempo_core::Task;

use crate::stats::ProductivityStats;

const LOW_COMPLETION_RATE: f64 = 50.0;
const LONG_AVERAGE_MINUTES: f64 = 120.0;
const MANY_OPEN_TASKS: usize = 10;

pub fn productivity_tips(stats: &ProductivityStats, tasks: &[Task]) -> Vec<String> {
    let mut tips = Vec::new();

    if stats.completion_rate < LOW_COMPLETION_RATE {
        tips.push("Try breaking down large tasks into smaller, manageable chunks.".to_string());
    }

    if stats.average_time_per_task > LONG_AVERAGE_MINUTES {
        tips.push(
            "Consider setting shorter time blocks to maintain focus and prevent burnout."
                .to_string(),
        );
    }

    let c = &stats.categories;
    if c.work.total > c.study.total + c.leisure.total {
        tips.push(
            "Remember to balance work with study and leisure activities for better well-being."
                .to_string(),
        );
    }

    let open_tasks = tasks.iter().filter(|t| !t.completed).count();
    if open_tasks > MANY_OPEN_TASKS {
        tips.push(
            "You have many open tasks. Try focusing on completing existing ones before adding new ones."
                .to_string(),
        );
    }

    if tips.is_empty() {
        tips.push("Great job! Keep maintaining your productive habits.".to_string());
    }

    tips
}
