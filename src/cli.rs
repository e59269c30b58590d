use anyhow::{Result, anyhow};
use pico_args::Arguments;
use std::{env, fs::File, io::BufReader, path::PathBuf, process::Command};

use crate::config::{DaemonConfigState, Profile, default_config_dir};
use crate::gestures::{GestureEngine, GestureEvent};
use crate::ipc;
use crate::replay;
use crate::sensitivity::OperatingMode;

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // Hidden daemon mode (spawned by `start`)
    if pargs.contains("--daemon") {
        return ipc::run_daemon();
    }

    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            if let Some(t) = topic {
                print_subcmd_help(&t);
            } else {
                print_help();
            }
            Ok(())
        }

        Some("start") => {
            let exe = std::env::current_exe()?;
            let child = Command::new(exe).arg("--daemon").spawn()?;
            println!("gesturenav: started daemon (pid={})", child.id());
            Ok(())
        }

        Some("stop") => request(serde_json::json!({"op":"shutdown"})),
        Some("status") => request(serde_json::json!({"op":"status"})),
        Some("reload") => request(serde_json::json!({"op":"reload"})),
        Some("list") => request(serde_json::json!({"op":"list"})),
        Some("doctor") => request(serde_json::json!({"op":"doctor"})),

        Some("use") => {
            let name: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: gesturenav use <profile_name>"))?;
            request(serde_json::json!({"op":"use","profile":name}))
        }

        Some("mode") => {
            let raw: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: gesturenav mode <normal|high_stress|emergency>"))?;
            let mode: OperatingMode = raw.parse()?;
            request(serde_json::json!({"op":"mode","mode":mode.as_str()}))
        }

        Some("role") => {
            let role: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: gesturenav role <name>"))?;
            request(serde_json::json!({"op":"role","role":role}))
        }

        Some("replay") => {
            let profile_path: Option<PathBuf> = pargs.opt_value_from_str("--profile")?;
            let mode: Option<OperatingMode> = pargs.opt_value_from_str("--mode")?;
            let role: Option<String> = pargs.opt_value_from_str("--role")?;
            let trace: PathBuf = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: gesturenav replay [--profile FILE] [--mode M] [--role R] <trace.jsonl>"))?;

            let profile = match profile_path {
                Some(p) => {
                    let text = std::fs::read_to_string(&p)?;
                    Profile::parse(&text, &p)?
                }
                None => DaemonConfigState::load_from(&default_config_dir()?)?.profile,
            };
            let mut context = profile.initial_context();
            if let Some(m) = mode {
                context.mode = m;
            }
            if let Some(r) = role {
                context.role = r;
            }

            let samples = replay::parse_trace(BufReader::new(File::open(&trace)?))?;
            let mut engine = GestureEngine::new(profile.engine_config(), context);
            let mut print = |ev: &GestureEvent| match serde_json::to_string(ev) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("gesturenav: cannot encode {ev:?}: {e}"),
            };
            replay::run(&mut engine, &samples, &mut print);
            Ok(())
        }

        Some("emit") => {
            // usage:
            //   gesturenav emit click right
            //   gesturenav emit scroll 3
            //   gesturenav emit key ALT+LEFT
            let what: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: gesturenav emit <click|scroll|key> ..."))?;
            let mut sink = crate::actions::NavigationSink::new()?;
            match what.as_str() {
                "click" => {
                    let btn: String = pargs
                        .free_from_str()
                        .map_err(|_| anyhow!("usage: gesturenav emit click <left|right|middle>"))?;
                    sink.click_mouse(&btn)?;
                    println!("ok: clicked {btn}");
                }
                "scroll" => {
                    let steps: i32 = pargs
                        .free_from_str()
                        .map_err(|_| anyhow!("usage: gesturenav emit scroll <steps>"))?;
                    sink.scroll_vertical(steps)?;
                    println!("ok: scrolled vertical {steps}");
                }
                "key" => {
                    let chord: String = pargs
                        .free_from_str()
                        .map_err(|_| anyhow!("usage: gesturenav emit key ALT+LEFT"))?;
                    sink.key_chord(&chord)?;
                    println!("ok: sent key chord {chord}");
                }
                other => return Err(anyhow!("unknown emit kind: {other}")),
            }
            Ok(())
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

fn request(req: serde_json::Value) -> Result<()> {
    let r = ipc::client_request(req)?;
    print_response(&r);
    Ok(())
}

fn print_help() {
    println!(
        r#"gesturenav - touch gesture navigation daemon

USAGE:
  gesturenav help [command]                 Show general or command-specific help
  gesturenav start                          Start the daemon
  gesturenav stop                           Stop the daemon
  gesturenav status                         Show daemon state
  gesturenav reload                         Reload active profile
  gesturenav use <name>                     Switch active profile
  gesturenav list                           List profiles
  gesturenav doctor                         Diagnose permissions/devices
  gesturenav mode <mode>                    Set operating mode (normal, high_stress, emergency)
  gesturenav role <name>                    Set operator role
  gesturenav replay <trace.jsonl>           Recognize gestures in a recorded trace
  gesturenav emit click <left|right|middle> Emit a mouse click
  gesturenav emit scroll <steps>            Emit vertical scroll (+/- steps)
  gesturenav emit key ALT+LEFT              Emit a key or chord

TIPS:
  - Profiles: ~/.config/gesturenav/profiles
  - Active profile pointer: ~/.config/gesturenav/active
  - Log level: GESTURENAV_LOG=debug
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "start" => println!("usage: gesturenav start\nStarts the background daemon."),
        "stop" => println!("usage: gesturenav stop\nStops the running daemon."),
        "status" => println!(
            "usage: gesturenav status\nShows active profile, mode, role, last gesture, devices, socket, PID."
        ),
        "reload" => println!(
            "usage: gesturenav reload\nReloads the current profile; keeps last good on error."
        ),
        "use" => println!(
            "usage: gesturenav use <name>\nSwitches active profile to <name> and reloads."
        ),
        "list" => println!("usage: gesturenav list\nLists available profiles."),
        "doctor" => println!(
            "usage: gesturenav doctor\nChecks permissions and lists detected multitouch devices."
        ),
        "mode" => println!(
            "usage: gesturenav mode <normal|high_stress|emergency>\nSwitches the sensitivity set used for recognition."
        ),
        "role" => println!(
            "usage: gesturenav role <name>\nSets the operator role; some patterns are role-gated."
        ),
        "replay" => println!(
            "usage: gesturenav replay [--profile FILE] [--mode M] [--role R] <trace.jsonl>\n\
             Feeds a JSON-lines touch trace through the recognizer and prints each event.\n\
             Without --profile the active profile is used."
        ),
        "emit" => println!(
            "usage:\n  gesturenav emit click <left|right|middle>\n  gesturenav emit scroll <steps>\n  gesturenav emit key ALT+LEFT"
        ),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}

fn print_response(v: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
}
