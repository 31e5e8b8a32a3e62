pub mod plan_analyzer;
