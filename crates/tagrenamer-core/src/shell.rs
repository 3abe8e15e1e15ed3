//! Shell-equivalent recording of physical actions.

use std::sync::{Arc, Mutex};

use crate::error::TreeError;
use crate::event::{Callbacks, Event, EventKind};

/// Template recorded for a move or rename.
pub const MOVE_COMMAND: &str = r#"mv -v "{}" "{}""#;

/// Template recorded for a removal.
pub const REMOVE_COMMAND: &str = r#"rm -v "{}""#;

/// Template recorded for a directory creation.
pub const MKDIR_COMMAND: &str = r#"mkdir -v "{}""#;

/// Escape the characters that break out of a double-quoted shell argument.
pub fn escape_argument(arg: &str) -> String {
    arg.replace('"', "\\\"")
        .replace('&', "\\&")
        .replace("\\/", "|")
        .replace('`', "\\`")
}

/// Substitute escaped `args` into the `{}` placeholders of `template`, in order.
///
/// Placeholders without a matching argument are dropped.
pub fn render_command(template: &str, args: &[&str]) -> String {
    let mut rendered = String::with_capacity(template.len() + args.iter().map(|a| a.len()).sum::<usize>());
    let mut args = args.iter();
    let mut rest = template;

    while let Some(pos) = rest.find("{}") {
        rendered.push_str(&rest[..pos]);
        if let Some(arg) = args.next() {
            rendered.push_str(&escape_argument(arg));
        }
        rest = &rest[pos + 2..];
    }
    rendered.push_str(rest);
    rendered
}

/// Pass the rendered command to the `shell_collect` handler, if there is one.
pub fn record_shell_equivalent(
    callbacks: &Callbacks,
    template: &str,
    args: &[&str],
) -> Result<(), TreeError> {
    if !callbacks.is_registered(EventKind::ShellCollect) {
        return Ok(());
    }
    let command = render_command(template, args);
    callbacks.invoke(&Event::ShellCollect(&command))?;
    Ok(())
}

/// Collects shell commands into an auditable script.
#[derive(Debug, Clone, Default)]
pub struct ShellScript {
    lines: Arc<Mutex<Vec<String>>>,
}

impl ShellScript {
    /// Create an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register this script as the `shell_collect` handler of `callbacks`.
    pub fn attach(&self, callbacks: Callbacks) -> Callbacks {
        let lines = Arc::clone(&self.lines);
        callbacks.on(EventKind::ShellCollect, move |event| {
            if let Event::ShellCollect(command) = event {
                lines
                    .lock()
                    .map_err(|e| e.to_string())?
                    .push((*command).to_string());
            }
            Ok(())
        })
    }

    /// Commands collected so far.
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of collected commands.
    pub fn len(&self) -> usize {
        self.lines().len()
    }

    /// Check whether nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render the collected commands as a POSIX shell script.
    pub fn render(&self) -> String {
        let mut script = String::from("#!/bin/sh\nset -e\n\n");
        for line in self.lines() {
            script.push_str(&line);
            script.push('\n');
        }
        script
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_argument() {
        assert_eq!(escape_argument(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(escape_argument("Simon & Garfunkel"), r"Simon \& Garfunkel");
        assert_eq!(escape_argument("`whoami`"), r"\`whoami\`");
        assert_eq!(escape_argument(r"AC\/DC"), "AC|DC");
        assert_eq!(escape_argument("plain"), "plain");
    }

    #[test]
    fn test_render_command() {
        let command = render_command(MOVE_COMMAND, &["/a/b & c.mp3", "/d/\"e\".mp3"]);
        assert_eq!(command, r#"mv -v "/a/b \& c.mp3" "/d/\"e\".mp3""#);
    }

    #[test]
    fn test_render_command_missing_argument() {
        assert_eq!(render_command(MOVE_COMMAND, &["/a"]), r#"mv -v "/a" """#);
    }

    #[test]
    fn test_record_only_reaches_registered_handler() {
        let callbacks = Callbacks::new().on(EventKind::ShellCollect, |_| Err("rejected".into()));
        assert!(record_shell_equivalent(&callbacks, REMOVE_COMMAND, &["/x"]).is_err());
        assert!(record_shell_equivalent(&Callbacks::new(), REMOVE_COMMAND, &["/x"]).is_ok());
    }

    #[test]
    fn test_script_collects_commands() {
        let script = ShellScript::new();
        let callbacks = script.attach(Callbacks::new());

        record_shell_equivalent(&callbacks, REMOVE_COMMAND, &["/music/`x`.mp3"]).unwrap();
        record_shell_equivalent(&callbacks, MKDIR_COMMAND, &["/music/Foo"]).unwrap();

        assert_eq!(script.len(), 2);
        assert_eq!(script.lines()[0], r#"rm -v "/music/\`x\`.mp3""#);
        assert!(script.render().starts_with("#!/bin/sh\n"));
        assert!(script.render().ends_with("mkdir -v \"/music/Foo\"\n"));
    }
}
