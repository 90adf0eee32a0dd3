pub mod fsutils;
pub mod time;
pub mod work_queue;
pub mod workers;
