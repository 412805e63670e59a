//! 班次感知的機台排程
//!
//! 依優先順序逐張訂單貪婪配置：先選最早空出的鋪布機，
//! 再選最早空出的裁剪機，裁剪不得早於同一訂單的鋪布完成。

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use chrono::NaiveDateTime;

use cutplan_core::{
    OptimizationResult, Resource, ResourcePool, Result, ScheduleEntry, ShiftCalendar,
};

/// 依 (空出時間, 資源池順序) 排列的最小堆積，同時間取池中較前的機台
struct MachineQueue<'a> {
    machines: &'a [Resource],
    heap: BinaryHeap<Reverse<(NaiveDateTime, usize)>>,
}

impl<'a> MachineQueue<'a> {
    fn new(machines: &'a [Resource], start: NaiveDateTime) -> Self {
        Self {
            machines,
            heap: (0..machines.len()).map(|i| Reverse((start, i))).collect(),
        }
    }

    /// 取出最早空出的機台
    fn next_free(&mut self) -> Option<(NaiveDateTime, usize)> {
        self.heap.pop().map(|Reverse(slot)| slot)
    }

    fn release(&mut self, index: usize, free_at: NaiveDateTime) {
        self.heap.push(Reverse((free_at, index)));
    }

    fn id(&self, index: usize) -> &str {
        &self.machines[index].id
    }
}

/// 機台排程器
pub struct ResourceScheduler<'a> {
    calendar: &'a ShiftCalendar,
    resources: &'a ResourcePool,
}

impl<'a> ResourceScheduler<'a> {
    /// 建立排程器；資源池必須兩個類別都有機台
    pub fn new(calendar: &'a ShiftCalendar, resources: &'a ResourcePool) -> Result<Self> {
        resources.validate()?;
        Ok(Self { calendar, resources })
    }

    /// 依給定順序排程所有結果
    pub fn schedule(
        &self,
        ordered: &[&OptimizationResult],
        plan_start: NaiveDateTime,
    ) -> Result<Vec<ScheduleEntry>> {
        let mut laying = MachineQueue::new(&self.resources.laying, plan_start);
        let mut cutting = MachineQueue::new(&self.resources.cutting, plan_start);
        let mut entries = Vec::with_capacity(ordered.len());

        for result in ordered {
            let (laying_start, laying_idx) = laying.next_free().ok_or_else(empty_pool)?;
            let laying_finish = self.calendar.project_finish(laying_start, result.laying_hours)?;
            laying.release(laying_idx, laying_finish);

            let (cutting_free, cutting_idx) = cutting.next_free().ok_or_else(empty_pool)?;
            let cutting_start = cutting_free.max(laying_finish);
            let cutting_finish = self.calendar.project_finish(cutting_start, result.cutting_hours)?;
            cutting.release(cutting_idx, cutting_finish);

            tracing::debug!(
                "訂單 {}: 鋪布 {} {} → {}, 裁剪 {} {} → {}",
                result.order_id,
                laying.id(laying_idx),
                laying_start,
                laying_finish,
                cutting.id(cutting_idx),
                cutting_start,
                cutting_finish
            );

            entries.push(ScheduleEntry {
                order_id: result.order_id.clone(),
                laying_resource_id: laying.id(laying_idx).to_string(),
                laying_start,
                laying_finish,
                cutting_resource_id: cutting.id(cutting_idx).to_string(),
                cutting_start,
                cutting_finish,
            });
        }

        Ok(entries)
    }
}

fn empty_pool() -> cutplan_core::CutPlanError {
    cutplan_core::CutPlanError::Configuration("資源池為空".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use cutplan_core::presets;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn at(day: u32, hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    fn result(id: &str, laying: f64, cutting: f64) -> OptimizationResult {
        OptimizationResult::new(id.to_string(), 1.0).with_hours(laying, cutting)
    }

    fn pool(laying: usize, cutting: usize) -> ResourcePool {
        let mut pool = ResourcePool::default();
        for i in 0..laying {
            pool = pool.with_resource(Resource::laying(&format!("E{}", i + 1), 1.0));
        }
        for i in 0..cutting {
            pool = pool.with_resource(Resource::cutting(&format!("C{}", i + 1), 1.0));
        }
        pool
    }

    #[test]
    fn test_two_orders_share_machines() {
        let calendar = ShiftCalendar::round_the_clock("24x7".to_string());
        let pool = pool(2, 1);
        let scheduler = ResourceScheduler::new(&calendar, &pool).unwrap();

        let a = result("A", 2.0, 1.0);
        let b = result("B", 1.0, 1.0);
        let entries = scheduler.schedule(&[&a, &b], at(3, 8, 0)).unwrap();

        assert_eq!(entries[0].laying_resource_id, "E1");
        assert_eq!(entries[0].laying_finish, at(3, 10, 0));
        assert_eq!(entries[0].cutting_start, at(3, 10, 0));
        assert_eq!(entries[0].cutting_finish, at(3, 11, 0));

        // B 在 E2 上平行鋪布，但要等 C1 空出
        assert_eq!(entries[1].laying_resource_id, "E2");
        assert_eq!(entries[1].laying_finish, at(3, 9, 0));
        assert_eq!(entries[1].cutting_start, at(3, 11, 0));
        assert_eq!(entries[1].queue_minutes(), 120);
    }

    #[test]
    fn test_ties_pick_first_machine_in_pool() {
        let calendar = ShiftCalendar::round_the_clock("24x7".to_string());
        let pool = pool(3, 3);
        let scheduler = ResourceScheduler::new(&calendar, &pool).unwrap();

        let a = result("A", 1.0, 1.0);
        let b = result("B", 1.0, 1.0);
        let c = result("C", 1.0, 1.0);
        let d = result("D", 1.0, 1.0);
        let entries = scheduler.schedule(&[&a, &b, &c, &d], at(3, 8, 0)).unwrap();

        let laying: Vec<_> = entries.iter().map(|e| e.laying_resource_id.as_str()).collect();
        assert_eq!(laying, vec!["E1", "E2", "E3", "E1"]);
        assert_eq!(entries[3].laying_start, at(3, 9, 0));
    }

    #[test]
    fn test_schedule_follows_shift_efficiency() {
        let calendar = presets::three_shift_calendar();
        let pool = pool(1, 1);
        let scheduler = ResourceScheduler::new(&calendar, &pool).unwrap();

        let a = result("A", 2.0, 0.0);
        let entries = scheduler.schedule(&[&a], at(3, 13, 0)).unwrap();
        assert_eq!(entries[0].laying_finish, at(3, 15, 6) + Duration::seconds(40));
        assert_eq!(entries[0].cutting_finish, entries[0].laying_finish);
    }

    #[test]
    fn test_empty_category_is_rejected() {
        let calendar = ShiftCalendar::round_the_clock("24x7".to_string());
        let pool = pool(1, 0);
        assert!(ResourceScheduler::new(&calendar, &pool).is_err());
    }

    proptest! {
        #[test]
        fn prop_no_overlap_and_precedence(
            hours in proptest::collection::vec((0.0f64..12.0, 0.0f64..6.0), 1..25),
            laying_count in 1usize..4,
            cutting_count in 1usize..4,
        ) {
            let calendar = presets::three_shift_calendar();
            let pool = pool(laying_count, cutting_count);
            let scheduler = ResourceScheduler::new(&calendar, &pool).unwrap();

            let results: Vec<_> = hours
                .iter()
                .enumerate()
                .map(|(i, (l, c))| result(&format!("O{i}"), *l, *c))
                .collect();
            let refs: Vec<_> = results.iter().collect();
            let start = at(3, 5, 30);
            let entries = scheduler.schedule(&refs, start).unwrap();

            let mut last_end: HashMap<String, NaiveDateTime> = HashMap::new();
            for entry in &entries {
                prop_assert!(entry.laying_start >= start);
                prop_assert!(entry.laying_finish >= entry.laying_start);
                prop_assert!(entry.cutting_start >= entry.laying_finish);
                prop_assert!(entry.cutting_finish >= entry.cutting_start);

                for (machine, begin, end) in [
                    (&entry.laying_resource_id, entry.laying_start, entry.laying_finish),
                    (&entry.cutting_resource_id, entry.cutting_start, entry.cutting_finish),
                ] {
                    if let Some(previous) = last_end.get(machine) {
                        prop_assert!(begin >= *previous);
                    }
                    last_end.insert(machine.clone(), end);
                }
            }
        }
    }
}
