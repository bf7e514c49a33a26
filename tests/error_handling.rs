//! Error handling integration tests.
//!
//! These tests verify that meaningful errors are returned when external
//! tools are missing or fail.

use std::path::Path;

use scenechapter::{
    ExitStatusInfo, ExternalTool, Remuxer, SceneChapterError, SystemToolRunner, ToolInvocation,
    ToolPaths, ToolRunner,
};

#[test]
fn missing_tool_is_a_launch_error() {
    let tools = ToolPaths {
        ffmpeg: "this-ffmpeg-does-not-exist".into(),
        ..ToolPaths::default()
    };

    let error = Remuxer::new("input.mp4")
        .run(&tools, &SystemToolRunner)
        .unwrap_err();

    assert!(matches!(error, SceneChapterError::ToolLaunch { .. }));
    assert_eq!(error.tool(), Some(ExternalTool::Ffmpeg));

    let error_message = error.to_string();
    assert!(
        error_message.contains("Failed to launch ffmpeg (this-ffmpeg-does-not-exist)"),
        "Error message should name the tool and program: {error_message}",
    );
}

#[cfg(unix)]
#[test]
fn system_runner_reports_exit_code() {
    let invocation =
        ToolInvocation::new(ExternalTool::Ffmpeg, "sh").args(["-c", "echo oops >&2; exit 3"]);

    let output = SystemToolRunner.run(&invocation).expect("Failed to run sh");
    assert_eq!(output.status, ExitStatusInfo::Code(3));
    assert_eq!(output.status.code(), Some(3));
    assert_eq!(output.stderr_tail(), "oops");

    let error = invocation.run_checked(&SystemToolRunner).unwrap_err();
    assert_eq!(error.to_string(), "ffmpeg failed with exit code 3");
}

#[cfg(unix)]
#[test]
fn system_runner_captures_stdout() {
    let invocation = ToolInvocation::new(ExternalTool::Ffprobe, "sh")
        .args(["-c", r#"printf '{"frames": []}'"#]);

    let output = invocation
        .run_checked(&SystemToolRunner)
        .expect("Failed to run sh");
    assert_eq!(output.stdout, br#"{"frames": []}"#);
}

#[test]
fn remuxed_path_is_next_to_input() {
    let remuxer = Remuxer::new("/media/talk.mov");
    assert_eq!(remuxer.input_path(), Path::new("/media/talk.mov"));
    assert_eq!(remuxer.output_path(), Path::new("/media/talk.mov.mkv"));
}

#[test]
fn non_tool_errors_have_no_tool() {
    assert_eq!(SceneChapterError::InvalidThreshold(-1.0).tool(), None);
    assert_eq!(
        SceneChapterError::InvalidTimestamp("x".into()).to_string(),
        "Invalid chapter timestamp: \"x\""
    );
}
