//! 排料圖（Layout）模式
//!
//! 一張排料圖由多個紙樣（pattern）組成，每個紙樣有自己的尺碼配比。
//! 訂單依紙樣列出需求，只有布幅相同且涵蓋訂單所有紙樣的排料圖才能使用。

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::catalog::CuttingPlan;
use crate::order::Order;
use crate::{CutPlanError, PlanningConfig, Result};

/// 布幅比較容差（公尺）
const WIDTH_EPSILON: f64 = 1e-9;

/// 排料圖中的紙樣
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutPiece {
    pub pattern: String,
    /// 每層各尺碼件數
    pub size_grade: BTreeMap<String, u32>,
}

/// 排料圖定義（長度單位：公尺）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSpec {
    pub id: String,
    pub fabric: String,
    pub fabric_width: f64,
    pub layout_length: f64,
    pub total_perimeter: f64,
    /// 每層廢料面積（平方公尺）
    pub waste_area: f64,
    pub utilization: f64,
    pub pieces: Vec<LayoutPiece>,
}

impl LayoutSpec {
    /// 排料圖包含的紙樣
    pub fn patterns(&self) -> BTreeSet<&str> {
        self.pieces.iter().map(|p| p.pattern.as_str()).collect()
    }

    /// 只計入訂單所需紙樣的每層各尺碼件數
    pub fn quantities_for(&self, patterns: &BTreeSet<&str>) -> BTreeMap<String, u32> {
        let mut quantities: BTreeMap<String, u32> = BTreeMap::new();
        for piece in self.pieces.iter().filter(|p| patterns.contains(p.pattern.as_str())) {
            for (size, &qty) in &piece.size_grade {
                let total = quantities.entry(size.clone()).or_insert(0);
                *total = total.saturating_add(qty);
            }
        }
        quantities
    }

    /// 轉換為裁剪方案
    pub fn to_cutting_plan(
        &self,
        fabric: &FabricSpec,
        patterns: &BTreeSet<&str>,
        max_layers: u32,
        waste_cost_per_m2: f64,
    ) -> CuttingPlan {
        let material_cost = self.layout_length * fabric.price_per_linear_meter;
        let cutting_cost = self.total_perimeter * fabric.cost_per_cut_meter;
        let laying_cost = fabric.cost_per_layer + self.layout_length * fabric.cost_per_layout_meter;
        let waste_cost = self.waste_area * waste_cost_per_m2;

        CuttingPlan {
            id: self.id.clone(),
            quantities: self.quantities_for(patterns),
            fabric_width: self.fabric_width,
            area_total: self.layout_length * self.fabric_width * self.utilization,
            lay_length: self.layout_length,
            perimeter_total: self.total_perimeter,
            material_cost,
            cutting_cost,
            laying_cost,
            waste_cost,
            cost_per_layer: material_cost + cutting_cost + laying_cost + waste_cost,
            setup_cost: fabric.setup_cost,
            waste_area: self.waste_area,
            laying_hours_per_layer: self.layout_length * fabric.laying_hours_per_meter,
            cutting_hours_per_layer: self.total_perimeter * fabric.cutting_hours_per_meter,
            max_layers,
        }
    }
}

fn default_laying_hours_per_meter() -> f64 {
    0.5
}

fn default_cutting_hours_per_meter() -> f64 {
    0.01
}

/// 布料成本參數
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FabricSpec {
    pub fabric: String,
    /// 每層固定鋪布成本
    pub cost_per_layer: f64,
    /// 每公尺布價
    pub price_per_linear_meter: f64,
    /// 每公尺周長裁剪成本
    pub cost_per_cut_meter: f64,
    /// 每公尺鋪布成本
    pub cost_per_layout_meter: f64,
    #[serde(default)]
    pub setup_cost: f64,
    #[serde(default = "default_laying_hours_per_meter")]
    pub laying_hours_per_meter: f64,
    #[serde(default = "default_cutting_hours_per_meter")]
    pub cutting_hours_per_meter: f64,
}

/// 訂單中單一紙樣的需求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternDemand {
    pub pattern: String,
    pub quantity: BTreeMap<String, u32>,
}

/// 排料圖模式的訂單
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutOrder {
    pub id: String,
    pub fabric_width: f64,
    pub pieces: Vec<PatternDemand>,
    /// 覆寫每張排料圖的最大層數
    #[serde(default)]
    pub max_layers: Option<u32>,
    /// 覆寫總長度上限（公尺）
    #[serde(default)]
    pub max_length: Option<f64>,
    pub deadline: NaiveDateTime,
}

impl LayoutOrder {
    /// 訂單需要的紙樣
    pub fn patterns(&self) -> BTreeSet<&str> {
        self.pieces.iter().map(|p| p.pattern.as_str()).collect()
    }

    /// 各尺碼總需求（所有紙樣加總）
    pub fn demand(&self) -> BTreeMap<String, u32> {
        let mut demand: BTreeMap<String, u32> = BTreeMap::new();
        for piece in &self.pieces {
            for (size, &qty) in &piece.quantity {
                let total = demand.entry(size.clone()).or_insert(0);
                *total = total.saturating_add(qty);
            }
        }
        demand
    }

    /// 轉成一般訂單（供排序與排程使用）
    pub fn to_order(&self) -> Order {
        Order {
            id: self.id.clone(),
            demand: self.demand(),
            deadline: self.deadline,
        }
    }
}

/// 排料圖目錄
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawLayoutCatalog")]
pub struct LayoutCatalog {
    layouts: Vec<LayoutSpec>,
    fabrics: Vec<FabricSpec>,
}

#[derive(Deserialize)]
struct RawLayoutCatalog {
    layouts: Vec<LayoutSpec>,
    fabrics: Vec<FabricSpec>,
}

impl TryFrom<RawLayoutCatalog> for LayoutCatalog {
    type Error = CutPlanError;

    fn try_from(raw: RawLayoutCatalog) -> Result<Self> {
        Self::new(raw.layouts, raw.fabrics)
    }
}

impl LayoutCatalog {
    /// 建立並驗證目錄：每張排料圖的布料都必須存在
    pub fn new(layouts: Vec<LayoutSpec>, fabrics: Vec<FabricSpec>) -> Result<Self> {
        let mut names = BTreeSet::new();
        for fabric in &fabrics {
            if !names.insert(fabric.fabric.as_str()) {
                return Err(CutPlanError::Configuration(format!(
                    "重複的布料: {}",
                    fabric.fabric
                )));
            }
        }

        let mut ids = BTreeSet::new();
        for layout in &layouts {
            if !ids.insert(layout.id.as_str()) {
                return Err(CutPlanError::Configuration(format!(
                    "重複的排料圖ID: {}",
                    layout.id
                )));
            }
            if !names.contains(layout.fabric.as_str()) {
                return Err(CutPlanError::Configuration(format!(
                    "排料圖 {} 使用未定義的布料 {}",
                    layout.id, layout.fabric
                )));
            }
            let utilization_ok = layout.utilization > 0.0 && layout.utilization <= 1.0;
            if !(layout.layout_length > 0.0) || !utilization_ok {
                return Err(CutPlanError::Configuration(format!(
                    "排料圖 {} 長度或利用率無效",
                    layout.id
                )));
            }
        }

        Ok(Self { layouts, fabrics })
    }

    /// 從 JSON 載入
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn layouts(&self) -> &[LayoutSpec] {
        &self.layouts
    }

    pub fn fabric(&self, name: &str) -> Option<&FabricSpec> {
        self.fabrics.iter().find(|f| f.fabric == name)
    }

    /// 布幅相同且涵蓋訂單所有紙樣的排料圖
    pub fn compatible_layouts(&self, order: &LayoutOrder) -> Vec<&LayoutSpec> {
        let required = order.patterns();
        self.layouts
            .iter()
            .filter(|l| (l.fabric_width - order.fabric_width).abs() < WIDTH_EPSILON)
            .filter(|l| required.is_subset(&l.patterns()))
            .collect()
    }

    /// 將相容的排料圖轉成此訂單的裁剪方案
    pub fn plans_for(&self, order: &LayoutOrder, config: &PlanningConfig) -> Vec<CuttingPlan> {
        let patterns = order.patterns();
        let max_layers = order
            .max_layers
            .map_or(config.max_layers_per_plan, |m| m.min(config.max_layers_per_plan));

        self.compatible_layouts(order)
            .into_iter()
            .filter_map(|layout| {
                let fabric = self.fabric(&layout.fabric)?;
                Some(layout.to_cutting_plan(
                    fabric,
                    &patterns,
                    max_layers,
                    config.waste_cost_per_m2,
                ))
            })
            .collect()
    }

    /// 依層數推算各紙樣、各尺碼的產出
    pub fn pattern_production(
        &self,
        order: &LayoutOrder,
        layers: &BTreeMap<String, u32>,
    ) -> BTreeMap<String, BTreeMap<String, u32>> {
        let mut production: BTreeMap<String, BTreeMap<String, u32>> = order
            .pieces
            .iter()
            .map(|p| (p.pattern.clone(), BTreeMap::new()))
            .collect();

        for (layout_id, &count) in layers {
            let Some(layout) = self.layouts.iter().find(|l| &l.id == layout_id) else {
                continue;
            };
            for piece in &layout.pieces {
                if let Some(sizes) = production.get_mut(&piece.pattern) {
                    for (size, &qty) in &piece.size_grade {
                        let produced = sizes.entry(size.clone()).or_insert(0);
                        *produced = produced.saturating_add(qty.saturating_mul(count));
                    }
                }
            }
        }

        production
    }
}
