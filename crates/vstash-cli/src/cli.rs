//! Command-line surface

use clap::{value_parser, Arg, ArgAction, ArgGroup, Command};

fn spec_arg(id: &'static str, help: &'static str) -> Arg {
    Arg::new(id).required(true).help(help)
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Compare values as normalised JSON")
}

fn metadata_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("description")
            .long("description")
            .help("Description to set"),
    )
    .arg(
        Arg::new("tag")
            .long("tag")
            .action(ArgAction::Append)
            .value_name("KEY=VALUE")
            .help("Tag to add (repeatable)"),
    )
    .arg(
        Arg::new("untag")
            .long("untag")
            .action(ArgAction::Append)
            .value_name("KEY")
            .help("Tag key to remove (repeatable)"),
    )
}

fn resource_command(name: &'static str, about: &'static str) -> Command {
    Command::new(name)
        .about(about)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("show")
                .about("Show one version")
                .arg(spec_arg("spec", "Version specifier, e.g. NAME#3 or NAME~1"))
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("log")
                .about("Show version history, newest first")
                .arg(Arg::new("name").required(true).help("Resource name"))
                .arg(
                    Arg::new("number")
                        .short('n')
                        .long("number")
                        .value_parser(value_parser!(usize))
                        .help("Show at most this many versions"),
                ),
        )
        .subcommand(
            Command::new("diff")
                .about("Compare two versions (the second defaults to the latest)")
                .arg(spec_arg("left", "Version specifier"))
                .arg(Arg::new("right").help("Version specifier"))
                .arg(json_arg()),
        )
        .subcommand(metadata_args(
            Command::new("add")
                .about("Stage a new resource")
                .arg(Arg::new("name").required(true).help("Resource name"))
                .arg(Arg::new("value").required(true).help("Value")),
        ))
        .subcommand(metadata_args(
            Command::new("update")
                .about("Stage a new version")
                .arg(Arg::new("name").required(true).help("Resource name"))
                .arg(Arg::new("value").required(true).help("Value")),
        ))
        .subcommand(
            Command::new("delete")
                .about("Stage a delete")
                .arg(Arg::new("name").required(true).help("Resource name"))
                .arg(
                    Arg::new("force")
                        .long("force")
                        .action(ArgAction::SetTrue)
                        .help("Delete without a recovery window"),
                )
                .arg(
                    Arg::new("recovery-window")
                        .long("recovery-window")
                        .value_parser(value_parser!(u32))
                        .value_name("DAYS")
                        .conflicts_with("force")
                        .help("Days the resource stays recoverable (7-30)"),
                ),
        )
}

fn scoped(cmd: Command) -> Command {
    cmd.arg(Arg::new("name").help("Resource name"))
        .arg(
            Arg::new("param")
                .long("param")
                .action(ArgAction::SetTrue)
                .help("Only parameters"),
        )
        .arg(
            Arg::new("secret")
                .long("secret")
                .action(ArgAction::SetTrue)
                .help("Only secrets"),
        )
        .group(ArgGroup::new("scope").args(["param", "secret"]))
}

/// Full `vstash` command tree
#[must_use]
pub fn command() -> Command {
    Command::new("vstash")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Versioned parameters and secrets with a local staging area")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("More log output (repeatable)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log as JSON lines"),
        )
        .subcommand(resource_command("param", "Parameter store"))
        .subcommand(resource_command("secret", "Secrets vault"))
        .subcommand(
            Command::new("stage")
                .about("Inspect and commit staged changes")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(scoped(Command::new("status").about("List staged changes")))
                .subcommand(scoped(
                    Command::new("diff")
                        .about("Compare staged values with the remote")
                        .arg(json_arg()),
                ))
                .subcommand(scoped(Command::new("push").about("Apply staged changes")))
                .subcommand(scoped(Command::new("reset").about("Discard staged changes"))),
        )
}
