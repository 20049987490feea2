use crate::model::{ranges_overlap, TaskId, TaskItem};
use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, HashMap};

/// Horizontal slot assignment for the visible task set. Tasks whose date
/// ranges share a calendar day never share a lane.
#[derive(Debug, Clone, Default)]
pub struct LaneLayout {
    lane_of: HashMap<TaskId, usize>,
    lane_count_by_day: BTreeMap<NaiveDate, usize>,
    pub total_lanes: usize,
}

/// One task bar segment within a single day cell, ordered by lane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSegment {
    pub task_id: TaskId,
    pub lane: usize,
    pub is_range_start: bool,
    pub is_range_end: bool,
}

impl LaneLayout {
    pub fn lane_of(&self, id: &str) -> Option<usize> {
        self.lane_of.get(id).copied()
    }

    /// Lanes that must be reserved vertically for `day` (0 when free).
    pub fn lane_count(&self, day: NaiveDate) -> usize {
        self.lane_count_by_day.get(&day).copied().unwrap_or(0)
    }

    /// Segments of `tasks` active on `day`, lane order, with range-edge
    /// flags for the renderer.
    pub fn segments_for_day(&self, tasks: &[TaskItem], day: NaiveDate) -> Vec<TaskSegment> {
        let mut segments: Vec<TaskSegment> = tasks
            .iter()
            .filter(|t| t.touches(day))
            .filter_map(|t| {
                self.lane_of(&t.id).map(|lane| TaskSegment {
                    task_id: t.id.clone(),
                    lane,
                    is_range_start: t.start == day,
                    is_range_end: t.end == day,
                })
            })
            .collect();
        segments.sort_by_key(|s| s.lane);
        segments
    }
}

/// First-fit lane assignment. Tasks are placed longest span first (ties by
/// start date, then id) into the lowest lane whose occupants they do not
/// overlap. The ordering is total, so recomputation over the same task set
/// is identical.
pub fn assign_lanes(tasks: &[TaskItem]) -> LaneLayout {
    let mut order: Vec<&TaskItem> = tasks.iter().collect();
    order.sort_by(|a, b| {
        b.span_days()
            .cmp(&a.span_days())
            .then_with(|| a.start.cmp(&b.start))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut lanes: Vec<Vec<(NaiveDate, NaiveDate)>> = Vec::new();
    let mut lane_of = HashMap::new();
    for task in order {
        let lane = lanes
            .iter()
            .position(|occupants| {
                occupants
                    .iter()
                    .all(|(s, e)| !ranges_overlap(task.start, task.end, *s, *e))
            })
            .unwrap_or_else(|| {
                lanes.push(Vec::new());
                lanes.len() - 1
            });
        lanes[lane].push((task.start, task.end));
        lane_of.insert(task.id.clone(), lane);
    }

    let mut lane_count_by_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for task in tasks {
        let Some(lane) = lane_of.get(&task.id).copied() else {
            continue;
        };
        let mut day = task.start;
        while day <= task.end {
            let count = lane_count_by_day.entry(day).or_insert(0);
            *count = (*count).max(lane + 1);
            day += Duration::days(1);
        }
    }

    LaneLayout {
        lane_of,
        lane_count_by_day,
        total_lanes: lanes.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskCategory;

    fn task(id: &str, start: &str, end: &str) -> TaskItem {
        TaskItem::new(
            id.into(),
            format!("task {id}"),
            TaskCategory::Todo,
            start.parse().unwrap(),
            end.parse().unwrap(),
            8.0,
        )
    }

    #[test]
    fn overlapping_tasks_get_distinct_lanes() {
        let tasks = vec![
            task("a", "2024-03-10", "2024-03-12"),
            task("b", "2024-03-11", "2024-03-11"),
        ];
        let layout = assign_lanes(&tasks);
        assert_ne!(layout.lane_of("a"), layout.lane_of("b"));
        assert_eq!(layout.total_lanes, 2);
    }

    #[test]
    fn disjoint_task_reuses_lane_zero() {
        // The March 2024 scenario: two overlapping tasks split lanes, a
        // third later task drops back to lane 0.
        let tasks = vec![
            task("a", "2024-03-10", "2024-03-12"),
            task("b", "2024-03-11", "2024-03-11"),
            task("c", "2024-03-20", "2024-03-21"),
        ];
        let layout = assign_lanes(&tasks);
        assert_eq!(layout.lane_of("a"), Some(0));
        assert_eq!(layout.lane_of("b"), Some(1));
        assert_eq!(layout.lane_of("c"), Some(0));
    }

    #[test]
    fn longer_tasks_win_lower_lanes() {
        let tasks = vec![
            task("short", "2024-03-10", "2024-03-10"),
            task("long", "2024-03-08", "2024-03-14"),
        ];
        let layout = assign_lanes(&tasks);
        assert_eq!(layout.lane_of("long"), Some(0));
        assert_eq!(layout.lane_of("short"), Some(1));
    }

    #[test]
    fn assignment_ignores_input_order() {
        let mut tasks = vec![
            task("a", "2024-03-10", "2024-03-12"),
            task("b", "2024-03-11", "2024-03-13"),
            task("c", "2024-03-12", "2024-03-12"),
            task("d", "2024-03-20", "2024-03-25"),
        ];
        let forward = assign_lanes(&tasks);
        tasks.reverse();
        let reversed = assign_lanes(&tasks);
        for t in &tasks {
            assert_eq!(forward.lane_of(&t.id), reversed.lane_of(&t.id));
        }
    }

    #[test]
    fn lane_count_reserves_through_the_max_lane() {
        let tasks = vec![
            task("a", "2024-03-10", "2024-03-12"),
            task("b", "2024-03-11", "2024-03-11"),
        ];
        let layout = assign_lanes(&tasks);
        let day = |s: &str| s.parse::<NaiveDate>().unwrap();
        assert_eq!(layout.lane_count(day("2024-03-10")), 1);
        assert_eq!(layout.lane_count(day("2024-03-11")), 2);
        assert_eq!(layout.lane_count(day("2024-03-12")), 1);
        assert_eq!(layout.lane_count(day("2024-03-13")), 0);
    }

    #[test]
    fn segments_carry_range_edge_flags() {
        let tasks = vec![task("a", "2024-03-10", "2024-03-12")];
        let layout = assign_lanes(&tasks);
        let day = |s: &str| s.parse::<NaiveDate>().unwrap();

        let first = layout.segments_for_day(&tasks, day("2024-03-10"));
        assert_eq!(first.len(), 1);
        assert!(first[0].is_range_start && !first[0].is_range_end);

        let middle = layout.segments_for_day(&tasks, day("2024-03-11"));
        assert!(!middle[0].is_range_start && !middle[0].is_range_end);

        let last = layout.segments_for_day(&tasks, day("2024-03-12"));
        assert!(!last[0].is_range_start && last[0].is_range_end);

        assert!(layout.segments_for_day(&tasks, day("2024-03-13")).is_empty());
    }

    #[test]
    fn segments_come_back_in_lane_order() {
        let tasks = vec![
            task("b", "2024-03-11", "2024-03-11"),
            task("a", "2024-03-10", "2024-03-12"),
        ];
        let layout = assign_lanes(&tasks);
        let day = "2024-03-11".parse::<NaiveDate>().unwrap();
        let segments = layout.segments_for_day(&tasks, day);
        assert_eq!(segments.len(), 2);
        assert!(segments[0].lane < segments[1].lane);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn arb_tasks() -> impl Strategy<Value = Vec<TaskItem>> {
            proptest::collection::vec((0i64..60, 0i64..10), 0..20).prop_map(|ranges| {
                ranges
                    .into_iter()
                    .enumerate()
                    .map(|(n, (offset, span))| {
                        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                            + Duration::days(offset);
                        TaskItem::new(
                            format!("t{n}"),
                            format!("task {n}"),
                            TaskCategory::Todo,
                            start,
                            start + Duration::days(span),
                            8.0,
                        )
                    })
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn overlapping_pairs_never_share_a_lane(tasks in arb_tasks()) {
                let layout = assign_lanes(&tasks);
                for (i, a) in tasks.iter().enumerate() {
                    for b in &tasks[i + 1..] {
                        if ranges_overlap(a.start, a.end, b.start, b.end) {
                            prop_assert_ne!(layout.lane_of(&a.id), layout.lane_of(&b.id));
                        }
                    }
                }
            }

            #[test]
            fn every_task_gets_a_lane_below_the_total(tasks in arb_tasks()) {
                let layout = assign_lanes(&tasks);
                for t in &tasks {
                    let lane = layout.lane_of(&t.id);
                    prop_assert!(lane.is_some());
                    prop_assert!(lane.unwrap() < layout.total_lanes.max(1));
                }
            }

            #[test]
            fn assignment_is_deterministic_across_recomputation(tasks in arb_tasks()) {
                let first = assign_lanes(&tasks);
                let second = assign_lanes(&tasks);
                prop_assert_eq!(first.total_lanes, second.total_lanes);
                for t in &tasks {
                    prop_assert_eq!(first.lane_of(&t.id), second.lane_of(&t.id));
                }
            }
        }
    }
}
