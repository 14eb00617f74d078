pub mod calendar;
pub mod models;

pub use calendar::SlotCalendar;
pub use models::Doctor;
