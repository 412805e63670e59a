//! 鋪布機與裁剪機資源

use serde::{Deserialize, Serialize};

use crate::{CutPlanError, Result};

/// 資源類別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceCategory {
    /// 鋪布機
    Laying,
    /// 裁剪機
    Cutting,
}

impl std::fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceCategory::Laying => write!(f, "鋪布機"),
            ResourceCategory::Cutting => write!(f, "裁剪機"),
        }
    }
}

/// 單一機台
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub category: ResourceCategory,
    /// 產能係數 (0, 1]
    pub efficiency: f64,
}

impl Resource {
    pub fn new(id: String, category: ResourceCategory, efficiency: f64) -> Self {
        Self {
            id,
            category,
            efficiency,
        }
    }

    pub fn laying(id: &str, efficiency: f64) -> Self {
        Self::new(id.to_string(), ResourceCategory::Laying, efficiency)
    }

    pub fn cutting(id: &str, efficiency: f64) -> Self {
        Self::new(id.to_string(), ResourceCategory::Cutting, efficiency)
    }
}

/// 依類別分組的資源池（保持輸入順序）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourcePool {
    pub laying: Vec<Resource>,
    pub cutting: Vec<Resource>,
}

impl ResourcePool {
    /// 由混合清單建立，依類別分組
    pub fn from_resources(resources: impl IntoIterator<Item = Resource>) -> Self {
        let (laying, cutting) = resources
            .into_iter()
            .partition(|r| r.category == ResourceCategory::Laying);
        Self { laying, cutting }
    }

    /// 建構器模式：新增機台
    pub fn with_resource(mut self, resource: Resource) -> Self {
        match resource.category {
            ResourceCategory::Laying => self.laying.push(resource),
            ResourceCategory::Cutting => self.cutting.push(resource),
        }
        self
    }

    pub fn by_category(&self, category: ResourceCategory) -> &[Resource] {
        match category {
            ResourceCategory::Laying => &self.laying,
            ResourceCategory::Cutting => &self.cutting,
        }
    }

    pub fn count(&self, category: ResourceCategory) -> usize {
        self.by_category(category).len()
    }

    /// 某類別的平均效率，類別為空時回傳 `None`
    pub fn mean_efficiency(&self, category: ResourceCategory) -> Option<f64> {
        let resources = self.by_category(category);
        if resources.is_empty() {
            return None;
        }
        Some(resources.iter().map(|r| r.efficiency).sum::<f64>() / resources.len() as f64)
    }

    /// 某類別的有效機台數（台數 × 平均效率）
    pub fn effective_capacity(&self, category: ResourceCategory) -> f64 {
        self.by_category(category).iter().map(|r| r.efficiency).sum()
    }

    /// 驗證效率與ID，且排程所需的兩個類別都不為空
    pub fn validate(&self) -> Result<()> {
        for category in [ResourceCategory::Laying, ResourceCategory::Cutting] {
            let resources = self.by_category(category);
            if resources.is_empty() {
                return Err(CutPlanError::Configuration(format!("沒有可用的{category}")));
            }
            for resource in resources {
                if resource.category != category {
                    return Err(CutPlanError::Configuration(format!(
                        "機台 {} 被放在錯誤的類別 {category}",
                        resource.id
                    )));
                }
                if !(resource.efficiency > 0.0 && resource.efficiency <= 1.0) {
                    return Err(CutPlanError::Configuration(format!(
                        "機台 {} 效率無效: {}",
                        resource.id, resource.efficiency
                    )));
                }
            }
        }

        let mut ids: Vec<&str> = self
            .laying
            .iter()
            .chain(self.cutting.iter())
            .map(|r| r.id.as_str())
            .collect();
        ids.sort_unstable();
        if let Some(pair) = ids.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(CutPlanError::Configuration(format!("重複的機台ID: {}", pair[0])));
        }

        Ok(())
    }
}
