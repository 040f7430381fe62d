//! Secure evaluation handler.
//! - handle_secureeval: script or file in a child interpreter

use std::path::PathBuf;

use smol_str::SmolStr;

use skein_runtime::secure::{secure_eval, SecureEval, SecureSource};
use skein_runtime::{Interp, Outcome, RuntimeError};

use crate::options::{parse_options, OptionSpec};
use crate::DebugCommand;

use super::concat;

const SECUREEVAL_OPTIONS: [OptionSpec; 3] = [
    OptionSpec::boolean("-file"),
    OptionSpec::boolean("-trusted"),
    OptionSpec::boolean("-events"),
];

impl DebugCommand {
    /// Event processing stays on for untrusted evaluations unless `-events`
    /// says otherwise.
    pub(crate) fn handle_secureeval(
        &self,
        interp: &Interp,
        args: &[SmolStr],
    ) -> Result<Outcome, RuntimeError> {
        let (options, index) = parse_options(&SECUREEVAL_OPTIONS, args)?;
        let [path, _, ..] = &args[index..] else {
            return Err(RuntimeError::usage(
                "debug secureeval ?options? path arg ?arg ...?",
            ));
        };
        let rest = &args[index + 1..];
        let trusted = options.boolean("-trusted").unwrap_or(false);
        let source = if options.boolean("-file").unwrap_or(false) {
            let [file] = rest else {
                return Err(RuntimeError::usage(
                    "debug secureeval -file true ?options? path fileName",
                ));
            };
            SecureSource::File(PathBuf::from(file.as_str()))
        } else {
            SecureSource::Script(concat(rest))
        };
        let request = SecureEval {
            path: path.to_string(),
            source,
            trusted,
            allow_events: options.boolean("-events").unwrap_or(!trusted),
        };
        Ok(secure_eval(interp, &self.registry, &request))
    }
}
