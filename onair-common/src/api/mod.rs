//! Request/response types shared by the sync service and its clients

mod types;

pub use types::{
    DeviceInfo, DeviceRegistration, HealthResponse, HistoryEntry, HistoryResponse, StatusView,
};
