//! # Input script interpreter module
//!
//! This module provides an interpreter for input scripts, which replay timed
//! input messages into the drive-by-wire control loop.
//!
//! A script contains one entry per line of the form
//!
//! ```text
//! <time_s>: <json input message>;
//! ```
//!
//! Lines that don't match this form (comments, blank lines) are ignored.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::fs;
use regex::RegexBuilder;
use thiserror::Error;

// Internal
use comms_if::msg::{InputMsg, MsgParseError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A message which is scripted to be delivered at a specific time.
#[derive(Debug)]
struct Entry {
    /// The time the message is supposed to be delivered at
    exec_time_s: f64,

    /// The message to deliver
    msg: InputMsg
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use `.get_pending`
/// to acquire a list of messages that need delivering.
#[derive(Debug)]
pub struct ScriptInterpreter {
    _script_path: Option<PathBuf>,
    entries: VecDeque<Entry>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains an invalid message at {0} s: {1}")]
    InvalidMsg(f64, MsgParseError),

    #[error("Script entries must be in time order, found {1} s after {0} s")]
    OutOfOrder(f64, f64)
}

#[derive(Debug)]
pub enum Pending {
    None,
    Some(Vec<InputMsg>),
    EndOfScript
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {

    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {

        let path = PathBuf::from(script_path.as_ref());

        if !path.exists() {
            return Err(
                ScriptError::ScriptNotFound(path.to_string_lossy().to_string()));
        }

        let script = fs::read_to_string(&path)
            .map_err(ScriptError::ScriptLoadError)?;

        let mut si = Self::from_script(&script)?;
        si._script_path = Some(path);

        Ok(si)
    }

    /// Create a new interpreter from the contents of a script.
    pub fn from_script(script: &str) -> Result<Self, ScriptError> {

        let mut queue: VecDeque<Entry> = VecDeque::new();

        // Go through the script executing __the magic regex__.
        let re = RegexBuilder::
            new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .expect("Script regex is invalid");

        for cap in re.captures_iter(script) {
            // Parse the exec time
            let exec_time_s: f64 = cap[1]
                .parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            // The payloads are JSON messages
            let msg = InputMsg::from_json(&cap[3])
                .map_err(|e| ScriptError::InvalidMsg(exec_time_s, e))?;

            if let Some(prev) = queue.back() {
                if exec_time_s < prev.exec_time_s {
                    return Err(ScriptError::OutOfOrder(prev.exec_time_s, exec_time_s))
                }
            }

            queue.push_back(Entry {
                exec_time_s,
                msg
            });
        }

        if queue.is_empty() {
            return Err(ScriptError::ScriptEmpty)
        }

        Ok(ScriptInterpreter {
            _script_path: None,
            entries: queue
        })
    }

    /// Return the messages due at or before `current_time_s`.
    pub fn get_pending(&mut self, current_time_s: f64) -> Pending {

        // If the queue is empty the script is over and we return the end of
        // script variant
        if self.entries.is_empty() {
            return Pending::EndOfScript
        }

        let mut msgs: Vec<InputMsg> = vec![];

        while self.entries
            .front()
            .map_or(false, |e| e.exec_time_s <= current_time_s)
        {
            if let Some(e) = self.entries.pop_front() {
                msgs.push(e.msg);
            }
        }

        if msgs.is_empty() {
            Pending::None
        }
        else {
            Pending::Some(msgs)
        }
    }

    /// Get the number of messages remaining in the script
    pub fn get_num_msgs(&self) -> usize {
        self.entries.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.entries.back() {
            Some(e) => e.exec_time_s,
            None => 0f64
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SCRIPT: &str = r#"
# Enable and start moving
0.0: {"type": "DBW_ENABLED", "payload": true};
0.0: {"type": "CURRENT_VELOCITY", "payload": {"linear_ms": 0.0}};
0.5: {"type": "TWIST_CMD", "payload": {"linear_ms": 5.0, "angular_rads": 0.0}};
2.0: {"type": "DBW_ENABLED", "payload": false};
"#;

    #[test]
    fn test_script_parsing() {
        let si = ScriptInterpreter::from_script(SCRIPT).unwrap();
        assert_eq!(si.get_num_msgs(), 4);
        assert_eq!(si.get_duration(), 2.0);
    }

    #[test]
    fn test_get_pending() {
        let mut si = ScriptInterpreter::from_script(SCRIPT).unwrap();

        match si.get_pending(0.0) {
            Pending::Some(m) => assert_eq!(m.len(), 2),
            p => panic!("Expected two messages, got {:?}", p)
        }
        assert!(matches!(si.get_pending(0.2), Pending::None));
        match si.get_pending(3.0) {
            Pending::Some(m) => {
                assert_eq!(m.len(), 2);
                assert_eq!(m[1], InputMsg::DbwEnabled(false));
            },
            p => panic!("Expected two messages, got {:?}", p)
        }
        assert!(matches!(si.get_pending(3.0), Pending::EndOfScript));
    }

    #[test]
    fn test_script_errors() {
        assert!(matches!(
            ScriptInterpreter::from_script("# nothing to see here\n"),
            Err(ScriptError::ScriptEmpty)
        ));
        assert!(matches!(
            ScriptInterpreter::from_script(r#"1.0: {"type": "NOPE", "payload": 1};"#),
            Err(ScriptError::InvalidMsg(_, _))
        ));
        assert!(matches!(
            ScriptInterpreter::from_script(
                "1.0: {\"type\": \"DBW_ENABLED\", \"payload\": true};\n\
                 0.5: {\"type\": \"DBW_ENABLED\", \"payload\": false};"
            ),
            Err(ScriptError::OutOfOrder(_, _))
        ));
        assert!(matches!(
            ScriptInterpreter::new("no/such/script.dbws"),
            Err(ScriptError::ScriptNotFound(_))
        ));
    }
}
