//! Animated GIF assembly through an external ImageMagick process
//!
//! The assembler never touches pixel data. It builds one command line of the form
//!
//! ```text
//! <tool> -delay 1x<fps> <frame-1> ... <frame-n> -coalesce -layers OptimizeTransparency <output>
//! ```
//!
//! runs it synchronously and maps the exit status to a `Result`. Frames are
//! passed through as given: no existence, format or ordering checks are made.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

/// ImageMagick v6 command name, used when no tool is configured
pub const DEFAULT_TOOL: &str = "convert";

/// Exit information captured from a finished child process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    /// Exit code, `None` when the process was terminated by a signal
    pub code: Option<i32>,
    pub success: bool,
    /// Captured standard error, kept for diagnostics only
    pub stderr: String,
}

impl RunOutput {
    /// A clean exit with status 0 and no diagnostics
    pub fn success() -> Self {
        Self {
            code: Some(0),
            success: true,
            stderr: String::new(),
        }
    }

    /// A non-zero exit with the given code and stderr text
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            success: false,
            stderr: stderr.into(),
        }
    }
}

/// Runs an argument vector as a child process and reports how it exited
///
/// An `Err` means the process could not be launched at all.
pub trait CommandRunner {
    fn run(&self, program: &OsStr, args: &[OsString]) -> io::Result<RunOutput>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, program: &OsStr, args: &[OsString]) -> io::Result<RunOutput> {
        (**self).run(program, args)
    }
}

/// Spawns real processes with `std::process::Command`
///
/// stdin is closed and stdout inherited, so `-` as output still reaches the
/// caller. stderr is captured.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &OsStr, args: &[OsString]) -> io::Result<RunOutput> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .output()?;

        Ok(RunOutput {
            code: output.status.code(),
            success: output.status.success(),
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        })
    }
}

/// Failure of the external assembly step
#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    /// The tool could not be started (not installed, not executable, ...)
    #[error("failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: io::Error,
    },
    /// The tool ran but exited unsuccessfully
    #[error("`{command}` {}", describe_exit(.code, .stderr))]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

fn describe_exit(code: &Option<i32>, stderr: &str) -> String {
    let status = match code {
        Some(code) => format!("exited with status {}", code),
        None => "was terminated by a signal".to_string(),
    };

    if stderr.is_empty() {
        status
    } else {
        format!("{}: {}", status, stderr)
    }
}

impl AssemblyError {
    /// The command line that was attempted
    pub fn command(&self) -> &str {
        match self {
            Self::Launch { command, .. } | Self::Failed { command, .. } => command,
        }
    }

    /// Exit code of the tool, if it ran and exited normally
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Launch { .. } => None,
            Self::Failed { code, .. } => *code,
        }
    }

    /// Whatever the tool wrote to stderr before failing
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Launch { .. } => None,
            Self::Failed { stderr, .. } => Some(stderr),
        }
    }
}

/// The exact program and argument vector for one assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyPlan {
    program: OsString,
    args: Vec<OsString>,
}

impl AssemblyPlan {
    pub fn new<P: AsRef<Path>>(
        program: impl Into<OsString>,
        frames: &[P],
        fps: u32,
        output: impl AsRef<Path>,
    ) -> Self {
        let mut args: Vec<OsString> = Vec::with_capacity(frames.len() + 6);
        args.push("-delay".into());
        args.push(delay_argument(fps).into());
        args.extend(frames.iter().map(|frame| frame.as_ref().as_os_str().to_owned()));
        args.push("-coalesce".into());
        args.push("-layers".into());
        args.push("OptimizeTransparency".into());
        args.push(output.as_ref().as_os_str().to_owned());

        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }
}

impl fmt::Display for AssemblyPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Value for `-delay`: one tick of 1/fps seconds, rendered as `1x<fps>`
pub fn delay_argument(fps: u32) -> String {
    format!("1x{}", fps)
}

/// Assembles GIFs with a configurable tool and process runner
#[derive(Debug, Clone)]
pub struct GifAssembler<R = SystemRunner> {
    tool: OsString,
    runner: R,
}

impl Default for GifAssembler<SystemRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl GifAssembler<SystemRunner> {
    /// Uses [`DEFAULT_TOOL`] found on `PATH` and real child processes
    pub fn new() -> Self {
        Self {
            tool: DEFAULT_TOOL.into(),
            runner: SystemRunner,
        }
    }
}

impl<R: CommandRunner> GifAssembler<R> {
    /// Sets the tool name or path to invoke
    pub fn with_tool(mut self, tool: impl Into<OsString>) -> Self {
        self.tool = tool.into();
        self
    }

    /// Replaces the process runner, keeping the configured tool
    pub fn with_runner<T: CommandRunner>(self, runner: T) -> GifAssembler<T> {
        GifAssembler {
            tool: self.tool,
            runner,
        }
    }

    pub fn tool(&self) -> &OsStr {
        &self.tool
    }

    /// Builds the invocation without running it
    pub fn plan<P: AsRef<Path>>(&self, frames: &[P], fps: u32, output: impl AsRef<Path>) -> AssemblyPlan {
        AssemblyPlan::new(self.tool.clone(), frames, fps, output)
    }

    /// Assembles `frames`, in order, into the GIF at `output`
    ///
    /// Blocks until the tool exits. Spawns exactly one process.
    pub fn assemble<P: AsRef<Path>>(
        &self,
        frames: &[P],
        fps: u32,
        output: impl AsRef<Path>,
    ) -> Result<(), AssemblyError> {
        self.execute(&self.plan(frames, fps, output))
    }

    /// Runs a previously built plan
    pub fn execute(&self, plan: &AssemblyPlan) -> Result<(), AssemblyError> {
        let result = self
            .runner
            .run(plan.program(), plan.args())
            .map_err(|source| AssemblyError::Launch {
                command: plan.to_string(),
                source,
            })?;

        if !result.success {
            return Err(AssemblyError::Failed {
                command: plan.to_string(),
                code: result.code,
                stderr: result.stderr,
            });
        }

        Ok(())
    }
}

/// Assembles `frames` into `output` with the default tool
pub fn assemble<P: AsRef<Path>>(
    frames: &[P],
    fps: u32,
    output: impl AsRef<Path>,
) -> Result<(), AssemblyError> {
    GifAssembler::new().assemble(frames, fps, output)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every invocation and answers with a canned result
    pub(crate) struct FakeRunner {
        pub calls: Mutex<Vec<(OsString, Vec<OsString>)>>,
        response: fn() -> io::Result<RunOutput>,
    }

    impl FakeRunner {
        pub fn new(response: fn() -> io::Result<RunOutput>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                response,
            }
        }

        pub fn succeeding() -> Self {
            Self::new(|| Ok(RunOutput::success()))
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn last_args(&self) -> Vec<String> {
            let calls = self.calls.lock().unwrap();
            let (_, args) = calls.last().expect("runner was never called");
            args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, program: &OsStr, args: &[OsString]) -> io::Result<RunOutput> {
            self.calls
                .lock()
                .unwrap()
                .push((program.to_owned(), args.to_vec()));
            (self.response)()
        }
    }

    #[test]
    fn test_argument_vector_for_three_frames() {
        let runner = FakeRunner::succeeding();
        let assembler = GifAssembler::new().with_runner(&runner);

        assembler
            .assemble(&["a.png", "b.png", "c.png"], 10, "out.gif")
            .unwrap();

        assert_eq!(runner.call_count(), 1);
        assert_eq!(
            runner.last_args(),
            vec![
                "-delay",
                "1x10",
                "a.png",
                "b.png",
                "c.png",
                "-coalesce",
                "-layers",
                "OptimizeTransparency",
                "out.gif"
            ]
        );
        assert_eq!(runner.calls.lock().unwrap()[0].0, OsString::from("convert"));
    }

    #[test]
    fn test_frame_order_is_preserved() {
        let runner = FakeRunner::succeeding();
        let frames = ["frame_09.png", "frame_01.png", "frame_05.png", "frame_01.png"];

        GifAssembler::new()
            .with_runner(&runner)
            .assemble(&frames, 12, "anim.gif")
            .unwrap();

        let args = runner.last_args();
        assert_eq!(&args[2..6], &frames);
    }

    #[test]
    fn test_delay_is_literal_fps() {
        assert_eq!(delay_argument(10), "1x10");
        assert_eq!(delay_argument(24), "1x24");
        assert_eq!(delay_argument(0), "1x0");
    }

    #[test]
    fn test_empty_frame_list_still_invokes_tool() {
        let runner = FakeRunner::succeeding();
        let frames: [&str; 0] = [];

        GifAssembler::new()
            .with_runner(&runner)
            .assemble(&frames, 24, "empty.gif")
            .unwrap();

        assert_eq!(runner.call_count(), 1);
        assert_eq!(
            runner.last_args(),
            vec![
                "-delay",
                "1x24",
                "-coalesce",
                "-layers",
                "OptimizeTransparency",
                "empty.gif"
            ]
        );
    }

    #[test]
    fn test_non_zero_exit_is_assembly_error() {
        let runner = FakeRunner::new(|| Ok(RunOutput::failure(1, "convert: no images defined")));
        let err = GifAssembler::new()
            .with_runner(&runner)
            .assemble(&["a.png"], 10, "out.gif")
            .unwrap_err();

        assert!(matches!(err, AssemblyError::Failed { .. }));
        assert_eq!(err.exit_code(), Some(1));
        assert_eq!(err.stderr(), Some("convert: no images defined"));
        assert_eq!(
            err.command(),
            "convert -delay 1x10 a.png -coalesce -layers OptimizeTransparency out.gif"
        );
        assert!(err.to_string().contains("exited with status 1"));
        assert_eq!(runner.call_count(), 1);
    }

    #[test]
    fn test_launch_failure_is_assembly_error() {
        let runner = FakeRunner::new(|| Err(io::Error::new(io::ErrorKind::NotFound, "not found")));
        let err = GifAssembler::new()
            .with_tool("missing-tool")
            .with_runner(&runner)
            .assemble(&["a.png"], 10, "out.gif")
            .unwrap_err();

        assert!(matches!(err, AssemblyError::Launch { .. }));
        assert_eq!(err.exit_code(), None);
        assert!(err.command().starts_with("missing-tool -delay"));
    }

    #[test]
    fn test_signal_termination_message() {
        let runner = FakeRunner::new(|| {
            Ok(RunOutput {
                code: None,
                success: false,
                stderr: String::new(),
            })
        });
        let err = GifAssembler::new()
            .with_runner(&runner)
            .assemble(&["a.png"], 5, "out.gif")
            .unwrap_err();

        assert!(err.to_string().ends_with("was terminated by a signal"));
    }

    #[test]
    fn test_plan_display_and_tool_override() {
        let assembler = GifAssembler::new().with_tool("/opt/im/bin/magick");
        let plan = assembler.plan(&["x.png", "y.png"], 15, "xy.gif");

        assert_eq!(plan.program(), OsStr::new("/opt/im/bin/magick"));
        assert_eq!(
            plan.to_string(),
            "/opt/im/bin/magick -delay 1x15 x.png y.png -coalesce -layers OptimizeTransparency xy.gif"
        );
    }

    /// Serializes tests that spawn real processes, so a script is never
    /// executed while another thread still holds it open for writing
    static SPAWN_LOCK: Mutex<()> = Mutex::new(());

    #[cfg(unix)]
    fn write_stub_tool(dir: &Path, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("stub-convert");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_exit_status() {
        let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let ok = GifAssembler::new().with_tool("true");
        assert!(ok.assemble(&["a.png"], 10, "out.gif").is_ok());

        let failing = GifAssembler::new().with_tool("false");
        let err = failing.assemble(&["a.png"], 10, "out.gif").unwrap_err();
        assert!(matches!(err, AssemblyError::Failed { code: Some(1), .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_stub_tool_receives_exact_arguments_once() {
        let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls.log");
        let tool = write_stub_tool(dir.path(), &format!("echo \"$*\" >> '{}'", log.display()));

        GifAssembler::new()
            .with_tool(&tool)
            .assemble(&["a.png", "b.png", "c.png"], 10, "out.gif")
            .unwrap();

        let calls = std::fs::read_to_string(&log).unwrap();
        let lines: Vec<&str> = calls.lines().collect();
        assert_eq!(
            lines,
            vec!["-delay 1x10 a.png b.png c.png -coalesce -layers OptimizeTransparency out.gif"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_stub_tool_stderr_is_reported() {
        let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let tool = write_stub_tool(dir.path(), "echo 'convert: unable to open image' >&2\nexit 3");

        let err = GifAssembler::new()
            .with_tool(&tool)
            .assemble(&["missing.png"], 10, "out.gif")
            .unwrap_err();

        assert_eq!(err.exit_code(), Some(3));
        assert_eq!(err.stderr(), Some("convert: unable to open image"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_stdout_is_inherited_for_dash_output() {
        let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        // The child must write to the same stdout as this process, not /dev/null
        let Ok(our_stdout) = std::fs::read_link("/proc/self/fd/1") else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let tool = write_stub_tool(
            dir.path(),
            &format!(
                "[ \"$(readlink /proc/$$/fd/1)\" = '{}' ] || exit 4",
                our_stdout.display()
            ),
        );

        let result = GifAssembler::new()
            .with_tool(&tool)
            .assemble(&["a.png"], 10, "-");

        assert!(result.is_ok(), "{:?}", result);
    }

    #[test]
    fn test_system_runner_unresolvable_tool() {
        let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let assembler = GifAssembler::new().with_tool("gif-assembler-no-such-tool-9f3a");
        let err = assembler.assemble(&["a.png"], 10, "out.gif").unwrap_err();

        assert!(matches!(err, AssemblyError::Launch { .. }));
    }
}
