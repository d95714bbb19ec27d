pub mod record;
pub mod series;
pub mod station;
pub mod variable;
