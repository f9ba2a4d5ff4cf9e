pub mod agent;
pub mod analytics;
pub mod capabilities;
pub mod stdio;
