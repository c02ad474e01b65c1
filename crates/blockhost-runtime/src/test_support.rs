//! Shared doubles for unit tests.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use blockhost_core::{
    CommandOutput, CommandRunner, MappingProtocol, PortMapper, PortMapping, PortMappingError,
};
use mockall::mock;

mock! {
    pub Runner {}

    #[async_trait]
    impl CommandRunner for Runner {
        async fn run(&self, program: &str, args: &[String], timeout: Duration)
        -> io::Result<CommandOutput>;
    }
}

mock! {
    pub Mapper {}

    #[async_trait]
    impl PortMapper for Mapper {
        async fn map(&self, mapping: &PortMapping) -> Result<(), PortMappingError>;
        async fn unmap(&self, protocol: MappingProtocol, external_port: u16)
        -> Result<(), PortMappingError>;
        async fn list_mappings(&self) -> Result<Vec<PortMapping>, PortMappingError>;
    }
}

pub fn succeeded() -> io::Result<CommandOutput> {
    Ok(CommandOutput {
        success: true,
        code: Some(0),
        ..CommandOutput::default()
    })
}

pub fn failed(stderr: &str) -> io::Result<CommandOutput> {
    Ok(CommandOutput {
        success: false,
        code: Some(1),
        stderr: stderr.to_string(),
        ..CommandOutput::default()
    })
}

/// Whether `program args..` joined by spaces equals `expected`.
pub fn invoked(program: &str, args: &[String], expected: &str) -> bool {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line == expected
}
