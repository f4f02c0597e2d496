use serde::{Deserialize, Serialize};

/// 性别
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

/// 疾病队列
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Cohort {
    Ebola,
    Lassa,
}

/// 暴露结局
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Exposure {
    /// 暴露但未发病
    Exposed,
    /// 发病后死亡
    Died,
    /// 发病后存活
    Survived,
    /// 社区对照
    Community,
}

/// 模拟患者
///
/// `timepoints` 为采样日（相对入组日的天数），CSV 中写作 `[0, 1, 2]`。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// 患者 ID，形如 `fakeid0007`
    pub patient_id: String,
    pub sex: Sex,
    pub age: u32,
    pub cohort: Cohort,
    pub cohort_exposure: Exposure,
    #[serde(with = "crate::table::list_cell")]
    pub timepoints: Vec<u32>,
}

/// 生成患者 ID
pub fn patient_id(index: usize) -> String {
    format!("fakeid{:04}", index)
}
