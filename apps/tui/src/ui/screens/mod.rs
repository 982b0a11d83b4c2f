pub mod card;
pub mod explore;
pub mod filters;
pub mod help;
