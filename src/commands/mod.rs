pub mod chart;
pub mod screen;
pub mod serve;
