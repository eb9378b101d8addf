pub mod broadcast;
pub mod l2;
pub mod logsignature;
