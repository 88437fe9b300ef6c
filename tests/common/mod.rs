//! Shared fixtures for integration tests
#![allow(dead_code)]

use scorecast::schema::StudentFeatures;
use std::path::{Path, PathBuf};

pub const HEADER: &str = "gender,race_ethnicity,parental_level_of_education,lunch,test_preparation_course,math_score,reading_score,writing_score";

const GENDERS: [&str; 2] = ["female", "male"];
const GROUPS: [&str; 5] = ["group A", "group B", "group C", "group D", "group E"];
const EDUCATION: [&str; 6] = [
    "some high school",
    "high school",
    "some college",
    "associate's degree",
    "bachelor's degree",
    "master's degree",
];
const LUNCH: [&str; 2] = ["standard", "free/reduced"];
const PREPARATION: [&str; 2] = ["none", "completed"];

/// Synthetic dataset of `rows` students where `math = math_fn(reading, writing, i)`
pub fn write_dataset(dir: &Path, rows: usize, math_fn: impl Fn(f64, f64, usize) -> f64) -> PathBuf {
    let mut csv = String::from(HEADER);
    csv.push('\n');
    for i in 0..rows {
        let reading = 30.0 + ((i * 37) % 61) as f64;
        let writing = 25.0 + ((i * 53) % 67) as f64;
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            GENDERS[i % 2],
            GROUPS[i % 5],
            EDUCATION[i % 6],
            LUNCH[(i / 2) % 2],
            PREPARATION[(i / 3) % 2],
            math_fn(reading, writing, i),
            reading,
            writing
        ));
    }
    let path = dir.join("stud.csv");
    std::fs::write(&path, csv).unwrap();
    path
}

/// The record used throughout the serving examples
pub fn sample_features() -> StudentFeatures {
    StudentFeatures::new("female", "group B", "bachelor's degree", "standard", "none", 72.0, 74.0)
}
