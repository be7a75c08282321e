// ABOUTME: Core data models describing the workload instances a console attaches to

pub mod instance;

pub use instance::InstanceTarget;
