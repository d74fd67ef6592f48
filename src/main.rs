use anyhow::Result;
use console::style;
use std::process::ExitCode;
use std::time::Instant;

use gif_assembler::cli::Args;
use gif_assembler::frames::expand_frames;
use gif_assembler::tool::{is_tool_available, resolve_tool};
use gif_assembler::utils::{
    create_spinner, error_println, format_duration, validate_frames, validate_inputs,
    verbose_println, warn_println,
};
use gif_assembler::{GifAssembler, JsonMessage, SystemRunner};

/// Handle --check-tool: report whether the tool answers `-version`
fn handle_check_tool(args: &Args) -> Result<bool> {
    let tool = resolve_tool(&SystemRunner, &args.tool);
    let available = is_tool_available(&SystemRunner, &tool);
    let tool = tool.to_string_lossy().into_owned();

    if args.json_progress {
        JsonMessage::tool(tool, available);
    } else if available {
        println!("{} {}", style("✓").green().bold(), style(&tool).bold());
    } else {
        println!(
            "{} {} not found or not working",
            style("✗").red().bold(),
            style(&tool).bold()
        );
        println!("  Install ImageMagick: brew install imagemagick (macOS) or apt-get install imagemagick (Linux)");
    }

    Ok(available)
}

fn run(mut args: Args) -> Result<bool> {
    let start_time = Instant::now();
    args.load_and_merge_config()?;

    let json = args.json_progress;
    // With `-o -` the GIF itself goes to stdout, so keep it clean
    let quiet = json || args.writes_to_stdout();
    let verbose = args.verbose && !quiet;

    if !quiet {
        println!("{}", style("GIF Assembler").bold().blue());
        println!();
    }

    if args.check_tool {
        return handle_check_tool(&args);
    }

    validate_inputs(&args)?;

    let extensions = args.parse_extensions();
    let frames = expand_frames(&args.inputs, &extensions)?;
    validate_frames(&frames)?;

    let assembler = GifAssembler::new().with_tool(resolve_tool(&SystemRunner, &args.tool));
    let plan = assembler.plan(&frames, args.fps, &args.output);

    if verbose {
        println!("{}", style("Configuration:").bold());
        println!("  Tool: {}", assembler.tool().to_string_lossy());
        println!("  Frames: {}", frames.len());
        println!("  Frame rate: {} fps", args.fps);
        println!("  Extensions: {:?}", extensions);
        println!("  Output: {}", args.output.display());
        println!();
        for (i, frame) in frames.iter().enumerate() {
            verbose_println(verbose, &format!("#{:<4} {}", i + 1, frame.display()));
        }
    }

    if args.dry_run {
        if json {
            JsonMessage::planned(plan.to_string());
        } else {
            println!("{}", style("Dry run, command not executed:").bold().cyan());
            println!("  {}", plan);
        }
        return Ok(true);
    }

    if !quiet && args.output.exists() {
        warn_println(&format!("Overwriting {}", args.output.display()));
    }

    if json {
        JsonMessage::started(frames.len(), &args.output, plan.to_string());
    }

    let spinner = (!quiet).then(|| {
        create_spinner(format!(
            "Assembling {} frames into {}",
            frames.len(),
            args.output.display()
        ))
    });

    let result = assembler.execute(&plan);
    let elapsed = start_time.elapsed();

    match result {
        Ok(()) => {
            if json {
                JsonMessage::completed(&args.output, elapsed.as_millis());
            } else if let Some(pb) = spinner {
                pb.finish_with_message("✓ Done");
                println!();
                println!("{}", style("Results Summary:").bold().green());
                println!("  Frames: {}", style(frames.len()).bold().green());
                println!("  Output: {}", style(args.output.display()).bold());
                println!(
                    "  Total time: {}",
                    style(format_duration(elapsed)).bold()
                );
            }
            Ok(true)
        }
        Err(err) => {
            if json {
                JsonMessage::failed(err.to_string(), err.exit_code());
            } else {
                if let Some(pb) = spinner {
                    pb.abandon_with_message("✗ Failed");
                }
                error_println(&err.to_string());
            }
            Ok(false)
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse_tracking_sources();
    let json = args.json_progress;

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            if json {
                JsonMessage::failed(format!("{:#}", err), None);
            } else {
                error_println(&format!("{:#}", err));
            }
            ExitCode::FAILURE
        }
    }
}
