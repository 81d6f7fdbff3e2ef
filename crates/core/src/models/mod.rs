pub mod analytics;
pub mod chart;
pub mod portfolio;
pub mod price;
pub mod quote;
pub mod settings;
pub mod view;
