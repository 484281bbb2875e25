//! API service modules for Globus services.

mod transfer;

pub use transfer::{
    EndpointManagerTaskListQuery, EndpointSearchQuery, TaskListQuery, TransferService,
};
