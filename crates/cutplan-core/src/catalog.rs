//! 裁剪方案（排料圖）目錄
//!
//! `GradeSpec` 是原始輸入，`CuttingPlan` 是正規化後的不可變方案，
//! 所有衍生屬性（面積、鋪布長度、周長、每層成本、廢料）只在 [`Catalog::normalize`] 計算一次。

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{CutPlanError, Result};

/// 原始排料圖定義
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeSpec {
    /// 排料圖ID
    pub id: String,

    /// 每層各尺碼產出件數
    pub quantities: BTreeMap<String, u32>,

    /// 布料利用率 (0, 1]
    pub utilization: f64,

    /// 啟用此排料圖的準備成本
    pub setup_cost: f64,

    /// 各尺碼裁片寬度（公尺）
    pub piece_widths: BTreeMap<String, f64>,

    /// 各尺碼裁片面積（平方公尺）
    pub piece_areas: BTreeMap<String, f64>,

    /// 各尺碼裁片周長（公尺）
    pub piece_perimeters: BTreeMap<String, f64>,

    /// 布幅（公尺）
    pub fabric_width: f64,

    /// 布料成本（每平方公尺實際耗用）
    pub fabric_cost: f64,

    /// 裁剪成本（每公尺周長）
    pub cutting_cost: f64,

    /// 鋪布固定成本（每層）
    pub laying_fixed_cost: f64,

    /// 鋪布變動成本（每公尺鋪布長度）
    pub laying_variable_cost: f64,

    /// 鋪布工時（小時 / 公尺）
    pub laying_hours_per_meter: f64,

    /// 裁剪工時（小時 / 公尺周長）
    pub cutting_hours_per_meter: f64,

    /// 此排料圖的最大層數
    #[serde(default)]
    pub max_layers: Option<u32>,
}

impl GradeSpec {
    /// 排料圖的裁片總寬度
    pub fn nominal_width(&self) -> f64 {
        self.quantities
            .iter()
            .map(|(size, &qty)| {
                self.piece_widths.get(size).copied().unwrap_or(0.0) * f64::from(qty)
            })
            .sum()
    }

    /// 布幅容差調整後的各尺碼件數
    ///
    /// 裁片總寬度超過 `布幅 × (1 + 容差)` 時，按 `布幅 / 總寬度` 等比縮減，
    /// 原本有產出的尺碼至少保留 1 件。件數為 0 的尺碼維持 0，
    /// 不會為了「至少 1 件」而憑空產出該尺碼。
    pub fn width_adjusted_quantities(&self, width_tolerance: f64) -> BTreeMap<String, u32> {
        let total_width = self.nominal_width();
        if total_width <= self.fabric_width * (1.0 + width_tolerance) {
            return self.quantities.clone();
        }

        let factor = self.fabric_width / total_width;
        self.quantities
            .iter()
            .map(|(size, &qty)| {
                let scaled = if qty == 0 {
                    0
                } else {
                    ((f64::from(qty) * factor).floor() as u32).max(1)
                };
                (size.clone(), scaled)
            })
            .collect()
    }

    fn validate(&self) -> Result<()> {
        if !(self.utilization > 0.0 && self.utilization <= 1.0) {
            return Err(CutPlanError::Configuration(format!(
                "排料圖 {} 利用率無效: {}",
                self.id, self.utilization
            )));
        }
        if !(self.fabric_width > 0.0) {
            return Err(CutPlanError::Configuration(format!(
                "排料圖 {} 布幅無效: {}",
                self.id, self.fabric_width
            )));
        }

        for (size, &qty) in &self.quantities {
            if qty == 0 {
                continue;
            }
            let dims = [
                ("寬度", &self.piece_widths),
                ("面積", &self.piece_areas),
                ("周長", &self.piece_perimeters),
            ];
            for (label, table) in dims {
                match table.get(size) {
                    Some(value) if *value >= 0.0 => {}
                    _ => {
                        return Err(CutPlanError::Configuration(format!(
                            "排料圖 {} 缺少尺碼 {} 的{}",
                            self.id, size, label
                        )))
                    }
                }
            }
        }

        Ok(())
    }
}

/// 正規化後的裁剪方案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuttingPlan {
    pub id: String,

    /// 每層各尺碼產出件數
    pub quantities: BTreeMap<String, u32>,

    pub fabric_width: f64,

    /// 每層裁片總面積（平方公尺）
    pub area_total: f64,

    /// 每層鋪布長度（公尺）
    pub lay_length: f64,

    /// 每層裁片總周長（公尺）
    pub perimeter_total: f64,

    /// 每層布料成本
    pub material_cost: f64,

    /// 每層裁剪成本
    pub cutting_cost: f64,

    /// 每層鋪布成本
    pub laying_cost: f64,

    /// 每層廢料成本
    pub waste_cost: f64,

    /// 每層總成本
    pub cost_per_layer: f64,

    pub setup_cost: f64,

    /// 每層廢料面積（平方公尺）
    pub waste_area: f64,

    pub laying_hours_per_layer: f64,

    pub cutting_hours_per_layer: f64,

    /// 層數上限
    pub max_layers: u32,
}

impl CuttingPlan {
    /// 從原始定義計算衍生屬性
    pub fn from_spec(
        spec: &GradeSpec,
        width_tolerance: f64,
        max_layers_per_plan: u32,
    ) -> Result<Self> {
        spec.validate()?;

        let quantities = spec.width_adjusted_quantities(width_tolerance);

        let sum_by = |table: &BTreeMap<String, f64>| -> f64 {
            quantities
                .iter()
                .map(|(size, &qty)| table.get(size).copied().unwrap_or(0.0) * f64::from(qty))
                .sum()
        };

        let area_total = sum_by(&spec.piece_areas);
        let perimeter_total = sum_by(&spec.piece_perimeters);
        let lay_length = area_total / (spec.fabric_width * spec.utilization);

        let material_cost = (area_total / spec.utilization) * spec.fabric_cost;
        let cutting_cost = perimeter_total * spec.cutting_cost;
        let laying_cost = spec.laying_fixed_cost + lay_length * spec.laying_variable_cost;

        let max_layers = spec
            .max_layers
            .map_or(max_layers_per_plan, |m| m.min(max_layers_per_plan));

        Ok(Self {
            id: spec.id.clone(),
            quantities,
            fabric_width: spec.fabric_width,
            area_total,
            lay_length,
            perimeter_total,
            material_cost,
            cutting_cost,
            laying_cost,
            waste_cost: 0.0,
            cost_per_layer: material_cost + cutting_cost + laying_cost,
            setup_cost: spec.setup_cost,
            waste_area: (spec.fabric_width * lay_length - area_total).max(0.0),
            laying_hours_per_layer: lay_length * spec.laying_hours_per_meter,
            cutting_hours_per_layer: perimeter_total * spec.cutting_hours_per_meter,
            max_layers,
        })
    }

    /// 某尺碼每層產出件數
    pub fn pieces_per_layer(&self, size: &str) -> u32 {
        self.quantities.get(size).copied().unwrap_or(0)
    }

    /// 每層總工時（鋪布 + 裁剪）
    pub fn hours_per_layer(&self) -> f64 {
        self.laying_hours_per_layer + self.cutting_hours_per_layer
    }
}

/// 裁剪方案目錄
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    plans: Vec<CuttingPlan>,
}

impl Catalog {
    /// 由已正規化的方案建立目錄
    pub fn from_plans(plans: Vec<CuttingPlan>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for plan in &plans {
            if !seen.insert(plan.id.as_str()) {
                return Err(CutPlanError::Configuration(format!(
                    "重複的裁剪方案ID: {}",
                    plan.id
                )));
            }
        }
        Ok(Self { plans })
    }

    /// 正規化原始排料圖，回傳新的目錄（不修改輸入）
    pub fn normalize(
        specs: &[GradeSpec],
        width_tolerance: f64,
        max_layers_per_plan: u32,
    ) -> Result<Self> {
        let plans = specs
            .iter()
            .map(|spec| CuttingPlan::from_spec(spec, width_tolerance, max_layers_per_plan))
            .collect::<Result<Vec<_>>>()?;

        for plan in &plans {
            tracing::debug!(
                "排料圖 {}: 面積 {:.3} m², 鋪布長度 {:.3} m, 每層工時 {:.3} h, 每層成本 {:.2}",
                plan.id,
                plan.area_total,
                plan.lay_length,
                plan.hours_per_layer(),
                plan.cost_per_layer
            );
        }

        Self::from_plans(plans)
    }

    pub fn plans(&self) -> &[CuttingPlan] {
        &self.plans
    }

    pub fn get(&self, plan_id: &str) -> Option<&CuttingPlan> {
        self.plans.iter().find(|p| p.id == plan_id)
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// 目錄中出現過的所有尺碼（排序）
    pub fn sizes(&self) -> BTreeSet<String> {
        self.plans
            .iter()
            .flat_map(|p| p.quantities.keys().cloned())
            .collect()
    }
}
