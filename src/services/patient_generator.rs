//! 模拟患者生成服务
//!
//! 每个字段独立抽取一个 `[0, 1)` 均匀随机数并按阈值映射到类别。

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::patient::{Cohort, Exposure, Patient, Sex, patient_id};

/// 采样时间表（天）
pub const SHORT_SCHEDULE: &[u32] = &[0, 1];
pub const MEDIUM_SCHEDULE: &[u32] = &[0, 1, 2];
pub const FULL_SCHEDULE: &[u32] = &[0, 1, 2, 3, 4, 7, 10];

/// 患者生成器
pub struct PatientGenerator {
    rng: StdRng,
}

impl PatientGenerator {
    /// 创建生成器，`seed` 为空时使用系统熵
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { rng }
    }

    /// 生成 `number` 个患者，ID 从 `fakeid0000` 开始
    pub fn generate(&mut self, number: usize) -> Vec<Patient> {
        tracing::info!("Generating {} fake patients", number);
        fake_patients(number, &mut self.rng)
    }
}

/// 使用给定随机源生成患者
pub fn fake_patients<R: Rng + ?Sized>(number: usize, rng: &mut R) -> Vec<Patient> {
    (0..number)
        .map(|i| Patient {
            patient_id: patient_id(i),
            sex: draw_sex(rng),
            age: draw_age(rng),
            cohort: draw_cohort(rng),
            cohort_exposure: draw_exposure(rng),
            timepoints: draw_timepoints(rng),
        })
        .collect()
}

pub fn draw_sex<R: Rng + ?Sized>(rng: &mut R) -> Sex {
    if rng.random::<f64>() > 0.5 {
        Sex::Male
    } else {
        Sex::Female
    }
}

pub fn draw_age<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    (rng.random::<f64>() * 100.0).round() as u32
}

pub fn draw_cohort<R: Rng + ?Sized>(rng: &mut R) -> Cohort {
    if rng.random::<f64>() > 0.67 {
        Cohort::Ebola
    } else {
        Cohort::Lassa
    }
}

/// 暴露结局：20% exposed，10% community，其余发病者中 80% died / 20% survived
pub fn draw_exposure<R: Rng + ?Sized>(rng: &mut R) -> Exposure {
    let u = rng.random::<f64>();
    if u > 0.8 {
        Exposure::Exposed
    } else if u > 0.1 {
        if rng.random::<f64>() > 0.2 {
            Exposure::Died
        } else {
            Exposure::Survived
        }
    } else {
        Exposure::Community
    }
}

/// 时间表：40% 短，20% 中，40% 完整
pub fn draw_timepoints<R: Rng + ?Sized>(rng: &mut R) -> Vec<u32> {
    let u = rng.random::<f64>();
    let schedule = if u < 0.4 {
        SHORT_SCHEDULE
    } else if u < 0.6 {
        MEDIUM_SCHEDULE
    } else {
        FULL_SCHEDULE
    };
    schedule.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const DRAWS: usize = 10_000;

    fn fraction<T, F>(mut draw: F, target: T) -> f64
    where
        T: PartialEq,
        F: FnMut(&mut StdRng) -> T,
    {
        let mut rng = StdRng::seed_from_u64(7);
        let hits = (0..DRAWS).filter(|_| draw(&mut rng) == target).count();
        hits as f64 / DRAWS as f64
    }

    #[test]
    fn test_ids_and_count() {
        let patients = PatientGenerator::new(Some(1)).generate(25);
        assert_eq!(patients.len(), 25);
        assert_eq!(patients[0].patient_id, "fakeid0000");
        assert_eq!(patients[24].patient_id, "fakeid0024");
    }

    #[test]
    fn test_seed_is_reproducible() {
        let a = PatientGenerator::new(Some(42)).generate(50);
        let b = PatientGenerator::new(Some(42)).generate(50);
        assert_eq!(a, b);
    }

    #[test]
    fn test_age_range() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!((0..DRAWS).all(|_| draw_age(&mut rng) <= 100));
    }

    #[test]
    fn test_field_distributions() {
        assert!((fraction(draw_sex, Sex::Male) - 0.5).abs() < 0.03);
        assert!((fraction(draw_cohort, Cohort::Ebola) - 0.33).abs() < 0.03);
        assert!((fraction(draw_exposure, Exposure::Exposed) - 0.2).abs() < 0.03);
        assert!((fraction(draw_exposure, Exposure::Community) - 0.1).abs() < 0.03);
        assert!((fraction(draw_exposure, Exposure::Died) - 0.56).abs() < 0.03);
        assert!((fraction(draw_exposure, Exposure::Survived) - 0.14).abs() < 0.03);
    }

    #[test]
    fn test_timepoint_schedules() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut counts: HashMap<Vec<u32>, usize> = HashMap::new();
        for _ in 0..DRAWS {
            *counts.entry(draw_timepoints(&mut rng)).or_default() += 1;
        }
        assert_eq!(counts.len(), 3);
        let share = |s: &[u32]| counts[&s.to_vec()] as f64 / DRAWS as f64;
        assert!((share(SHORT_SCHEDULE) - 0.4).abs() < 0.03);
        assert!((share(MEDIUM_SCHEDULE) - 0.2).abs() < 0.03);
        assert!((share(FULL_SCHEDULE) - 0.4).abs() < 0.03);
    }
}
