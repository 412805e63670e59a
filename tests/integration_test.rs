//! 集成測試

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, NaiveDateTime};
use cutplan::*;
use rstest::rstest;

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

/// 單一尺碼排料圖：鋪布變動成本、布料與裁剪成本為 0，每層成本 = 鋪布固定成本
fn unit_grade(id: &str, size: &str, pieces: u32, cost_per_layer: f64, setup: f64) -> GradeSpec {
    GradeSpec {
        id: id.to_string(),
        quantities: BTreeMap::from([(size.to_string(), pieces)]),
        utilization: 0.8,
        setup_cost: setup,
        piece_widths: BTreeMap::from([(size.to_string(), 0.25)]),
        piece_areas: BTreeMap::from([(size.to_string(), 0.2)]),
        piece_perimeters: BTreeMap::from([(size.to_string(), 2.0)]),
        fabric_width: 1.0,
        fabric_cost: 0.0,
        cutting_cost: 0.0,
        laying_fixed_cost: cost_per_layer,
        laying_variable_cost: 0.0,
        laying_hours_per_meter: 0.5,
        cutting_hours_per_meter: 0.01,
        max_layers: Some(20),
    }
}

fn single_machine_pair() -> ResourcePool {
    ResourcePool::from_resources([Resource::laying("E1", 1.0), Resource::cutting("C1", 1.0)])
}

#[test]
fn test_single_order_end_to_end() {
    // 需求 10 件 P，排料圖每層 2 件、每層成本 1、準備成本 5
    let planner = ProductionPlanner::new(
        PlanningConfig::new().with_production_hours(24.0),
        ShiftCalendar::round_the_clock("24x7".to_string()),
        single_machine_pair(),
    )
    .unwrap();
    let orders = vec![Order::new("PED-1".to_string(), at(4, 0)).with_demand("P", 10)];

    let plan = planner
        .plan(&orders, &[unit_grade("G1", "P", 2, 1.0, 5.0)], at(3, 8))
        .unwrap();

    let result = plan.result("PED-1").unwrap();
    assert_eq!(result.layers["G1"], 5);
    assert_eq!(result.production["P"], 10);
    assert!((result.costs.total - 10.0).abs() < 1e-9);
    assert_eq!(result.overproduction["P"], 0.0);
    assert_eq!(result.relaxation_factor, 1.0);

    // 每層鋪布 0.25h、裁剪 0.04h
    let entry = plan.schedule_for("PED-1").unwrap();
    assert_eq!(entry.laying_start, at(3, 8));
    assert_eq!(entry.laying_finish, at(3, 9) + chrono::Duration::minutes(15));
    assert_eq!(entry.cutting_start, entry.laying_finish);
    assert_eq!(entry.cutting_finish, entry.cutting_start + chrono::Duration::minutes(12));

    assert!(plan.infeasible_orders.is_empty());
    assert!(plan.warnings.is_empty());
    assert_eq!(plan.kpis.orders_planned, 1);
}

#[rstest]
#[case(0.0)]
#[case(0.05)]
#[case(0.2)]
fn test_overproduction_bound_without_relaxation(#[case] percentage: f64) {
    let grades = vec![
        unit_grade("ONE-P", "P", 1, 1.0, 2.0),
        unit_grade("ONE-M", "M", 1, 1.0, 2.0),
        unit_grade("PAIR-P", "P", 2, 1.5, 2.0),
        unit_grade("TRIO-M", "M", 3, 2.0, 2.0),
    ];
    let planner = ProductionPlanner::new(
        PlanningConfig::new()
            .with_relaxation(false)
            .with_overproduction(percentage, 10.0),
        ShiftCalendar::round_the_clock("24x7".to_string()),
        single_machine_pair(),
    )
    .unwrap();
    let orders = vec![
        Order::new("A".to_string(), at(5, 0)).with_demand("P", 7).with_demand("M", 11),
        Order::new("B".to_string(), at(6, 0)).with_demand("P", 13),
    ];

    let plan = planner.plan(&orders, &grades, at(3, 8)).unwrap();
    assert_eq!(plan.results.len(), 2);

    for (order, result) in orders.iter().zip(&plan.results) {
        assert!(result.demand_met());
        for (size, &demand) in &order.demand {
            let produced = result.production.get(size).copied().unwrap_or(0);
            assert!(produced >= demand);
            assert!(f64::from(produced - demand) <= f64::from(demand) * percentage + 1e-9);
            assert_eq!(result.penalized_excess[size], 0.0);
        }
    }
}

#[test]
fn test_standard_week_schedule_properties() {
    let planner = ProductionPlanner::new(
        PlanningConfig::new().with_criterion(PriorityCriterion::ProductionTime),
        presets::three_shift_calendar(),
        presets::standard_resources(),
    )
    .unwrap();
    let orders = vec![
        Order::new("PED-001".to_string(), at(5, 0)).with_demand("M", 12).with_demand("G", 12),
        Order::new("PED-002".to_string(), at(4, 0)).with_demand("P", 8).with_demand("GG", 6),
        Order::new("PED-003".to_string(), at(7, 0)).with_demand("P", 4).with_demand("M", 4),
        Order::new("PED-004".to_string(), at(6, 0)).with_demand("G", 10),
    ];

    let plan = planner.plan(&orders, &presets::standard_grades(), at(3, 13)).unwrap();
    assert_eq!(plan.schedule.len(), 4);

    // 排程順序與優先順序一致，分數遞增
    let scheduled: Vec<_> = plan.schedule.iter().map(|e| e.order_id.as_str()).collect();
    let ranked: Vec<_> = plan.priority.iter().map(|r| r.order_id.as_str()).collect();
    assert_eq!(scheduled, ranked);
    assert!(plan.priority.windows(2).all(|w| w[0].score <= w[1].score));

    let mut last_end: HashMap<&str, NaiveDateTime> = HashMap::new();
    for entry in &plan.schedule {
        assert!(entry.cutting_start >= entry.laying_finish);
        for (machine, begin, end) in [
            (entry.laying_resource_id.as_str(), entry.laying_start, entry.laying_finish),
            (entry.cutting_resource_id.as_str(), entry.cutting_start, entry.cutting_finish),
        ] {
            if let Some(previous) = last_end.get(machine) {
                assert!(begin >= *previous);
            }
            last_end.insert(machine, end);
        }
    }

    let finish = plan.schedule.iter().map(|e| e.finish()).max().unwrap();
    assert_eq!(plan.kpis.plan_finish, Some(finish));
    let total: f64 = plan.results.iter().map(|r| r.costs.total).sum();
    assert!((plan.kpis.total_cost - total).abs() < 1e-9);
}

#[test]
fn test_planning_is_idempotent() {
    let planner = ProductionPlanner::new(
        PlanningConfig::new(),
        presets::three_shift_calendar(),
        presets::standard_resources(),
    )
    .unwrap();
    let orders = vec![
        Order::new("X".to_string(), at(5, 0)).with_demand("P", 6).with_demand("G", 9),
        Order::new("Y".to_string(), at(4, 0)).with_demand("M", 5),
    ];

    let first = planner.plan(&orders, &presets::standard_grades(), at(3, 6)).unwrap();
    let second = planner.plan(&orders, &presets::standard_grades(), at(3, 6)).unwrap();

    assert_eq!(first.results, second.results);
    assert_eq!(first.schedule, second.schedule);
    assert_eq!(first.priority, second.priority);
    assert_ne!(first.run_id, second.run_id);
}

#[test]
fn test_layout_plan_reports_pattern_production() {
    let catalog = LayoutCatalog::from_json_str(
        r#"{
            "fabrics": [
                {"fabric": "DENIM", "cost_per_layer": 1.5, "price_per_linear_meter": 12.0,
                 "cost_per_cut_meter": 0.2, "cost_per_layout_meter": 0.3, "setup_cost": 20.0}
            ],
            "layouts": [
                {"id": "D-1", "fabric": "DENIM", "fabric_width": 1.6, "layout_length": 3.2,
                 "total_perimeter": 18.0, "waste_area": 0.7, "utilization": 0.86,
                 "pieces": [
                    {"pattern": "FRONT", "size_grade": {"P": 1, "M": 2}},
                    {"pattern": "BACK", "size_grade": {"P": 1, "M": 2}}
                 ]},
                {"id": "D-2", "fabric": "DENIM", "fabric_width": 1.6, "layout_length": 2.1,
                 "total_perimeter": 11.0, "waste_area": 0.4, "utilization": 0.84,
                 "pieces": [{"pattern": "FRONT", "size_grade": {"P": 2}}]}
            ]
        }"#,
    )
    .unwrap();

    let order = LayoutOrder {
        id: "JEANS-1".to_string(),
        fabric_width: 1.6,
        pieces: vec![
            PatternDemand {
                pattern: "FRONT".to_string(),
                quantity: BTreeMap::from([("P".to_string(), 5), ("M".to_string(), 10)]),
            },
            PatternDemand {
                pattern: "BACK".to_string(),
                quantity: BTreeMap::from([("P".to_string(), 5), ("M".to_string(), 10)]),
            },
        ],
        max_layers: None,
        max_length: None,
        deadline: at(6, 0),
    };

    let planner = ProductionPlanner::new(
        PlanningConfig::new(),
        presets::three_shift_calendar(),
        presets::standard_resources(),
    )
    .unwrap();
    let plan = planner.plan_layouts(&[order], &catalog, at(3, 6)).unwrap();

    // 只有 D-1 同時包含 FRONT 與 BACK
    let result = plan.result("JEANS-1").unwrap();
    assert_eq!(result.used_plans, vec!["D-1".to_string()]);
    assert_eq!(result.layers["D-1"], 5);

    let production = &plan.pattern_production["JEANS-1"];
    assert_eq!(production["FRONT"]["P"], 5);
    assert_eq!(production["BACK"]["M"], 10);
}

#[test]
fn test_config_from_json_rejects_unknown_criterion() {
    let err = PlanningConfig::from_json_str(r#"{"criterion": "shortest_first"}"#).unwrap_err();
    assert!(matches!(err, CutPlanError::InvalidCriterion(_)));

    let config =
        PlanningConfig::from_json_str(r#"{"criterion": "total_cost", "worker_threads": 2}"#)
            .unwrap();
    assert_eq!(config.criterion, PriorityCriterion::TotalCost);
    assert_eq!(config.worker_threads, 2);
}

#[test]
fn test_plan_serializes_to_json() {
    logging::init_test();

    let planner = ProductionPlanner::new(
        PlanningConfig::new(),
        ShiftCalendar::round_the_clock("24x7".to_string()),
        single_machine_pair(),
    )
    .unwrap();
    let orders = vec![Order::new("PED-1".to_string(), at(4, 0)).with_demand("P", 4)];
    let plan = planner
        .plan(&orders, &[unit_grade("G1", "P", 2, 1.0, 5.0)], at(3, 8))
        .unwrap();

    let json = serde_json::to_value(&plan).unwrap();
    assert_eq!(json["results"][0]["order_id"], "PED-1");
    assert_eq!(json["schedule"][0]["laying_resource_id"], "E1");
}
