use crate::grid::MonthDayCell;
use crate::model::TaskId;
use crate::store::{TaskPatch, TaskStore};
use chrono::{Duration, NaiveDate};
use ratatui::layout::{Position, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeEdge {
    Start,
    End,
}

/// Current pointer gesture. A gesture runs from press to release; misses
/// during a drag hold the last valid position instead of cancelling.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    CreatingSelection {
        anchor: usize,
        current: usize,
    },
    ResizingTask {
        task_id: TaskId,
        edge: ResizeEdge,
    },
    MovingTask {
        task_id: TaskId,
        anchor_start: NaiveDate,
        anchor_cell: usize,
        has_moved: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureEffect {
    None,
    OpenCreateDialog { start: NaiveDate, end: NaiveDate },
    OpenEditDialog { task_id: TaskId },
}

/// One rendered task bar, as a mouse target. The first column of a bar on
/// its range-start cell and the last column on its range-end cell act as
/// resize handles; everything else is the draggable body.
#[derive(Debug, Clone)]
pub struct SegmentHit {
    pub task_id: TaskId,
    pub rect: Rect,
    pub start_handle: bool,
    pub end_handle: bool,
}

/// Screen rectangles recorded during the last draw, replaced wholesale on
/// every frame so a resize is stale for at most one frame.
#[derive(Debug, Clone, Default)]
pub struct CellGeometry {
    cells: Vec<(usize, Rect)>,
    segments: Vec<SegmentHit>,
}

impl CellGeometry {
    pub fn clear(&mut self) {
        self.cells.clear();
        self.segments.clear();
    }

    pub fn record_cell(&mut self, index: usize, rect: Rect) {
        self.cells.push((index, rect));
    }

    pub fn record_segment(&mut self, hit: SegmentHit) {
        self.segments.push(hit);
    }

    /// First recorded cell whose rectangle contains the pointer.
    pub fn hit_cell(&self, x: u16, y: u16) -> Option<usize> {
        self.cells
            .iter()
            .find(|(_, rect)| rect.contains(Position { x, y }))
            .map(|(index, _)| *index)
    }

    pub fn hit_segment(&self, x: u16, y: u16) -> Option<&SegmentHit> {
        self.segments
            .iter()
            .find(|hit| hit.rect.contains(Position { x, y }))
    }
}

#[derive(Debug, Default)]
pub struct GestureController {
    gesture: Gesture,
}

impl GestureController {
    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn is_active(&self) -> bool {
        self.gesture != Gesture::Idle
    }

    /// Ordered cell-index range of an in-progress create selection, for the
    /// renderer's highlight.
    pub fn selection_range(&self) -> Option<(usize, usize)> {
        match &self.gesture {
            Gesture::CreatingSelection { anchor, current } => {
                Some((*anchor.min(current), *anchor.max(current)))
            }
            _ => None,
        }
    }

    pub fn pointer_down(&mut self, x: u16, y: u16, geometry: &CellGeometry, store: &TaskStore) {
        if self.gesture != Gesture::Idle {
            return;
        }
        if let Some(hit) = geometry.hit_segment(x, y) {
            if hit.start_handle && x == hit.rect.x {
                self.gesture = Gesture::ResizingTask {
                    task_id: hit.task_id.clone(),
                    edge: ResizeEdge::Start,
                };
            } else if hit.end_handle && x + 1 == hit.rect.x + hit.rect.width {
                self.gesture = Gesture::ResizingTask {
                    task_id: hit.task_id.clone(),
                    edge: ResizeEdge::End,
                };
            } else if let (Some(task), Some(cell)) =
                (store.get(&hit.task_id), geometry.hit_cell(x, y))
            {
                self.gesture = Gesture::MovingTask {
                    task_id: hit.task_id.clone(),
                    anchor_start: task.start,
                    anchor_cell: cell,
                    has_moved: false,
                };
            }
        } else if let Some(cell) = geometry.hit_cell(x, y) {
            self.gesture = Gesture::CreatingSelection {
                anchor: cell,
                current: cell,
            };
        }
    }

    /// Advances the active gesture. Move and resize mutate the store live;
    /// there is no separate commit on release.
    pub fn pointer_move(
        &mut self,
        x: u16,
        y: u16,
        geometry: &CellGeometry,
        days: &[MonthDayCell],
        store: &mut TaskStore,
    ) {
        let Some(cell) = geometry.hit_cell(x, y) else {
            return;
        };
        let Some(target) = days.get(cell).map(|d| d.date) else {
            return;
        };
        match &mut self.gesture {
            Gesture::Idle => {}
            Gesture::CreatingSelection { current, .. } => *current = cell,
            Gesture::ResizingTask { task_id, edge } => {
                let Some(task) = store.get(task_id) else {
                    return;
                };
                // The dragged edge clamps against the fixed one; it never
                // crosses over.
                let patch = match edge {
                    ResizeEdge::Start => TaskPatch {
                        start: Some(target.min(task.end)),
                        ..TaskPatch::default()
                    },
                    ResizeEdge::End => TaskPatch {
                        end: Some(target.max(task.start)),
                        ..TaskPatch::default()
                    },
                };
                let id = task_id.clone();
                store.update(&id, patch);
            }
            Gesture::MovingTask {
                task_id,
                anchor_start,
                anchor_cell,
                has_moved,
            } => {
                let delta = cell as i64 - *anchor_cell as i64;
                if delta != 0 {
                    *has_moved = true;
                }
                let Some(task) = store.get(task_id) else {
                    return;
                };
                let span = task.span_days();
                let new_start = *anchor_start + Duration::days(delta);
                let patch = TaskPatch {
                    start: Some(new_start),
                    end: Some(new_start + Duration::days(span - 1)),
                    ..TaskPatch::default()
                };
                let id = task_id.clone();
                store.update(&id, patch);
            }
        }
    }

    pub fn pointer_up(&mut self, days: &[MonthDayCell]) -> GestureEffect {
        match std::mem::take(&mut self.gesture) {
            Gesture::CreatingSelection { anchor, current } => {
                let (a, b) = (anchor.min(current), anchor.max(current));
                match (days.get(a), days.get(b)) {
                    (Some(first), Some(last)) => GestureEffect::OpenCreateDialog {
                        start: first.date,
                        end: last.date,
                    },
                    _ => GestureEffect::None,
                }
            }
            Gesture::MovingTask {
                task_id,
                has_moved: false,
                ..
            } => GestureEffect::OpenEditDialog { task_id },
            _ => GestureEffect::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::build_month_grid;
    use crate::model::{TaskCategory, TaskItem};
    use crate::storage::{PlannerScope, TaskFileLocation};
    use tempfile::TempDir;

    const CELL_W: u16 = 10;
    const CELL_H: u16 = 4;

    fn days() -> Vec<MonthDayCell> {
        build_month_grid("2024-03-10".parse().unwrap())
    }

    fn store(dir: &TempDir) -> TaskStore {
        TaskStore::load(TaskFileLocation {
            path: dir.path().join("tasks.json"),
            scope: PlannerScope::Project,
        })
    }

    fn cell_rect(index: usize) -> Rect {
        let col = (index % 7) as u16;
        let row = (index / 7) as u16;
        Rect::new(col * CELL_W, row * CELL_H, CELL_W, CELL_H)
    }

    fn grid_geometry() -> CellGeometry {
        let mut geometry = CellGeometry::default();
        for index in 0..42 {
            geometry.record_cell(index, cell_rect(index));
        }
        geometry
    }

    // Pointer coordinates inside a cell's body, away from any bar.
    fn center_of(index: usize) -> (u16, u16) {
        let rect = cell_rect(index);
        (rect.x + rect.width / 2, rect.y + rect.height - 1)
    }

    fn bar_in_cell(index: usize, task_id: &str, start_handle: bool, end_handle: bool) -> SegmentHit {
        let cell = cell_rect(index);
        SegmentHit {
            task_id: task_id.into(),
            rect: Rect::new(cell.x, cell.y + 1, cell.width, 1),
            start_handle,
            end_handle,
        }
    }

    fn add_task(store: &mut TaskStore, id: &str, start: &str, end: &str) {
        store.add(TaskItem::new(
            id.into(),
            format!("task {id}"),
            TaskCategory::Todo,
            start.parse().unwrap(),
            end.parse().unwrap(),
            8.0,
        ));
    }

    #[test]
    fn drag_on_empty_cells_seeds_a_create_range() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let days = days();
        let geometry = grid_geometry();
        let mut controller = GestureController::default();

        let (x, y) = center_of(10);
        controller.pointer_down(x, y, &geometry, &store);
        assert_eq!(controller.selection_range(), Some((10, 10)));

        let (x, y) = center_of(12);
        let mut store = store;
        controller.pointer_move(x, y, &geometry, &days, &mut store);
        assert_eq!(controller.selection_range(), Some((10, 12)));

        let effect = controller.pointer_up(&days);
        assert_eq!(
            effect,
            GestureEffect::OpenCreateDialog {
                start: days[10].date,
                end: days[12].date,
            }
        );
        assert!(!controller.is_active());
    }

    #[test]
    fn backwards_selection_yields_the_same_ordered_range() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        let days = days();
        let geometry = grid_geometry();
        let mut controller = GestureController::default();

        let (x, y) = center_of(12);
        controller.pointer_down(x, y, &geometry, &store);
        let (x, y) = center_of(10);
        controller.pointer_move(x, y, &geometry, &days, &mut store);

        let effect = controller.pointer_up(&days);
        assert_eq!(
            effect,
            GestureEffect::OpenCreateDialog {
                start: days[10].date,
                end: days[12].date,
            }
        );
    }

    #[test]
    fn hit_test_misses_hold_the_last_position() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        let days = days();
        let geometry = grid_geometry();
        let mut controller = GestureController::default();

        let (x, y) = center_of(10);
        controller.pointer_down(x, y, &geometry, &store);
        let (x, y) = center_of(11);
        controller.pointer_move(x, y, &geometry, &days, &mut store);
        // Way outside every recorded rectangle.
        controller.pointer_move(500, 500, &geometry, &days, &mut store);
        assert_eq!(controller.selection_range(), Some((10, 11)));
    }

    #[test]
    fn same_cell_release_is_a_click_and_opens_edit() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        add_task(&mut store, "t1", "2024-03-10", "2024-03-12");
        let days = days();
        let mut geometry = grid_geometry();
        // 2024-03-10 is grid index 14 (third row starts the 10th).
        let index = days.iter().position(|d| d.iso == "2024-03-10").unwrap();
        geometry.record_segment(bar_in_cell(index, "t1", true, false));

        let mut controller = GestureController::default();
        let bar = cell_rect(index);
        // Press on the bar body (not the first handle column).
        controller.pointer_down(bar.x + 3, bar.y + 1, &geometry, &store);
        assert!(matches!(
            controller.gesture(),
            Gesture::MovingTask { has_moved: false, .. }
        ));

        // Wiggle inside the same cell.
        controller.pointer_move(bar.x + 4, bar.y + 1, &geometry, &days, &mut store);
        let effect = controller.pointer_up(&days);
        assert_eq!(effect, GestureEffect::OpenEditDialog { task_id: "t1".into() });
        let task = store.get("t1").unwrap();
        assert_eq!(task.start, "2024-03-10".parse().unwrap());
        assert_eq!(task.end, "2024-03-12".parse().unwrap());
    }

    #[test]
    fn cross_cell_move_shifts_the_range_and_keeps_duration() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        add_task(&mut store, "t1", "2024-03-10", "2024-03-12");
        let days = days();
        let index = days.iter().position(|d| d.iso == "2024-03-10").unwrap();
        let mut geometry = grid_geometry();
        geometry.record_segment(bar_in_cell(index, "t1", true, false));

        let mut controller = GestureController::default();
        let bar = cell_rect(index);
        controller.pointer_down(bar.x + 3, bar.y + 1, &geometry, &store);

        // Two cells to the right.
        let (x, y) = center_of(index + 2);
        controller.pointer_move(x, y, &geometry, &days, &mut store);

        let task = store.get("t1").unwrap();
        assert_eq!(task.start, "2024-03-12".parse().unwrap());
        assert_eq!(task.end, "2024-03-14".parse().unwrap());
        assert_eq!(task.span_days(), 3);

        let effect = controller.pointer_up(&days);
        assert_eq!(effect, GestureEffect::None);
    }

    #[test]
    fn move_offsets_stay_anchored_to_the_original_start() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        add_task(&mut store, "t1", "2024-03-10", "2024-03-11");
        let days = days();
        let index = days.iter().position(|d| d.iso == "2024-03-10").unwrap();
        let mut geometry = grid_geometry();
        geometry.record_segment(bar_in_cell(index, "t1", true, false));

        let mut controller = GestureController::default();
        let bar = cell_rect(index);
        controller.pointer_down(bar.x + 3, bar.y + 1, &geometry, &store);

        // Out three cells, then back one: net offset is +2 from the anchor,
        // not cumulative.
        let (x, y) = center_of(index + 3);
        controller.pointer_move(x, y, &geometry, &days, &mut store);
        let (x, y) = center_of(index + 2);
        controller.pointer_move(x, y, &geometry, &days, &mut store);

        let task = store.get("t1").unwrap();
        assert_eq!(task.start, "2024-03-12".parse().unwrap());
        assert_eq!(task.end, "2024-03-13".parse().unwrap());
    }

    #[test]
    fn resize_start_clamps_at_the_end_date() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        add_task(&mut store, "t1", "2024-03-10", "2024-03-12");
        let days = days();
        let index = days.iter().position(|d| d.iso == "2024-03-10").unwrap();
        let mut geometry = grid_geometry();
        geometry.record_segment(bar_in_cell(index, "t1", true, false));

        let mut controller = GestureController::default();
        let bar = cell_rect(index);
        // First column of the range-start bar is the start handle.
        controller.pointer_down(bar.x, bar.y + 1, &geometry, &store);
        assert_eq!(
            *controller.gesture(),
            Gesture::ResizingTask {
                task_id: "t1".into(),
                edge: ResizeEdge::Start,
            }
        );

        // Drag far past the end date.
        let end_index = days.iter().position(|d| d.iso == "2024-03-15").unwrap();
        let (x, y) = center_of(end_index);
        controller.pointer_move(x, y, &geometry, &days, &mut store);

        let task = store.get("t1").unwrap();
        assert_eq!(task.start, task.end);
        assert_eq!(task.end, "2024-03-12".parse().unwrap());

        assert_eq!(controller.pointer_up(&days), GestureEffect::None);
    }

    #[test]
    fn resize_end_extends_and_never_crosses_the_start() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        add_task(&mut store, "t1", "2024-03-10", "2024-03-11");
        let days = days();
        let end_cell = days.iter().position(|d| d.iso == "2024-03-11").unwrap();
        let mut geometry = grid_geometry();
        geometry.record_segment(bar_in_cell(end_cell, "t1", false, true));

        let mut controller = GestureController::default();
        let bar = cell_rect(end_cell);
        controller.pointer_down(bar.x + bar.width - 1, bar.y + 1, &geometry, &store);
        assert_eq!(
            *controller.gesture(),
            Gesture::ResizingTask {
                task_id: "t1".into(),
                edge: ResizeEdge::End,
            }
        );

        let target = days.iter().position(|d| d.iso == "2024-03-14").unwrap();
        let (x, y) = center_of(target);
        controller.pointer_move(x, y, &geometry, &days, &mut store);
        assert_eq!(store.get("t1").unwrap().end, "2024-03-14".parse().unwrap());

        // Dragging before the start clamps to the start.
        let before = days.iter().position(|d| d.iso == "2024-03-08").unwrap();
        let (x, y) = center_of(before);
        controller.pointer_move(x, y, &geometry, &days, &mut store);
        let task = store.get("t1").unwrap();
        assert_eq!(task.end, task.start);
    }

    #[test]
    fn press_outside_all_geometry_stays_idle() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let geometry = grid_geometry();
        let mut controller = GestureController::default();
        controller.pointer_down(500, 500, &geometry, &store);
        assert!(!controller.is_active());
        assert_eq!(controller.pointer_up(&days()), GestureEffect::None);
    }
}
