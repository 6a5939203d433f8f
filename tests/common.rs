#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use authshell::config::{parse_config, ConfigV1};
use authshell::navigation::RecordingNavigator;
use authshell::startup;
use authshell::state::ShellState;

pub fn memory_config(base_url: &str) -> ConfigV1 {
    let yaml = format!(
        r#"
version: "1.0.0"
api:
  base_url: "{base_url}"
  refresh_timeout_in_ms: 2000
storage:
  type: memory
logging:
  level: "debug"
  format: "console"
"#
    );
    parse_config(&yaml).expect("valid test config")
}

pub fn file_config(base_url: &str, session_file: &Path) -> ConfigV1 {
    let yaml = format!(
        r#"
version: "1.0.0"
api:
  base_url: "{base_url}"
storage:
  type: file
  path: "{}"
"#,
        session_file.display()
    );
    parse_config(&yaml).expect("valid test config")
}

/// Builds a shell without resolving the session.
pub fn build_shell(config: ConfigV1) -> (ShellState, Arc<RecordingNavigator>) {
    let navigator = Arc::new(RecordingNavigator::new());
    let state = startup::build(Arc::new(config), navigator.clone()).expect("shell builds");
    (state, navigator)
}
