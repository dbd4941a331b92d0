mod reconciler;
mod registry;
pub mod views;

pub use reconciler::Reconciler;
pub use registry::ChannelRegistry;
pub use views::SidebarEntry;
