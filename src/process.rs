use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::{Command, ExitStatus};

use anyhow::Context;
use tracing::debug;

use crate::error::XvmError;

/// Runs `program` to completion with the parent's standard streams and
/// returns its exit code.
pub fn run<I, K, V>(program: &Path, args: &[OsString], envs: I) -> anyhow::Result<i32>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    debug!(program = %program.display(), args = args.len(), "spawning child process");

    let status = Command::new(program)
        .args(args)
        .envs(envs)
        .status()
        .with_context(|| format!("failed to execute {}", program.display()))?;

    let code = exit_code(status);
    debug!(program = %program.display(), code, "child process exited");
    Ok(code)
}

/// Like [`run`], but a nonzero exit becomes [`XvmError::ChildExit`].
pub fn run_checked<I, K, V>(program: &Path, args: &[OsString], envs: I) -> anyhow::Result<()>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    match run(program, args, envs)? {
        0 => Ok(()),
        code => Err(XvmError::ChildExit {
            program: program.display().to_string(),
            code,
        }
        .into()),
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(body: &str) -> Vec<OsString> {
        vec![OsString::from("-c"), OsString::from(body)]
    }

    #[test]
    fn propagates_exit_code() {
        let code = run(
            Path::new("/bin/sh"),
            &sh("exit 7"),
            std::iter::empty::<(&str, &str)>(),
        )
        .expect("run");
        assert_eq!(code, 7);
    }

    #[test]
    fn checked_run_reports_child_exit() {
        let program = Path::new("/bin/sh");
        let args = sh("[ \"$XVM_TEST\" = yes ] && exit 3; exit 0");

        run_checked(program, &args, [("XVM_TEST", "no")]).expect("exit 0");
        let err = run_checked(program, &args, [("XVM_TEST", "yes")]).expect_err("exit 3");
        assert!(matches!(
            err.downcast_ref::<XvmError>(),
            Some(XvmError::ChildExit { code: 3, .. })
        ));
    }

    #[test]
    fn missing_program_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let result = run(
            &temp.path().join("absent"),
            &[],
            std::iter::empty::<(&str, &str)>(),
        );
        assert!(result.is_err());
    }
}
