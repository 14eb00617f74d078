pub mod booking;
pub mod cancellation;
pub mod consistency;
pub mod locks;
pub mod memory_store;
pub mod notifier;
pub mod store;
pub mod supabase_store;

pub use booking::AppointmentBookingService;
pub use cancellation::AppointmentCancellationService;
pub use consistency::SchedulingConsistencyService;
pub use locks::SlotLockRegistry;
pub use memory_store::InMemorySchedulingStore;
pub use notifier::{AppointmentNotifier, TracingNotifier};
pub use store::{AtomicUnit, SchedulingStore};
pub use supabase_store::SupabaseSchedulingStore;
