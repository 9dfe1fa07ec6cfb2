use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use argtrace::{Arch, ArgSpec, Bank, Placement, Settings, arrange, parse_list};

#[derive(Parser)]
#[command(name = "argtrace")]
#[command(about = "Inspect argspec argument layouts for a target calling convention")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an argspec list and print where each argument ends up
    Layout {
        #[arg(help = "Comma-separated argspec list, e.g. arg1/i32,arg2/f,retval/x64")]
        spec: String,

        #[arg(short, long, default_value = "x86_64", help = "Target architecture")]
        arch: Arch,

        #[arg(long, help = "Treat the target as 32-bit (4-byte stack words)")]
        ilp32: bool,

        #[arg(long, help = "Emit the layout as JSON")]
        json: bool,
    },
    /// Print the argument registers of an architecture in ABI order
    Registers {
        #[arg(short, long, default_value = "x86_64", help = "Target architecture")]
        arch: Arch,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Layout {
            spec,
            arch,
            ilp32,
            json,
        } => {
            let settings = Settings {
                arch,
                lp64: !ilp32,
            };
            let mut args = parse_list(&spec, &settings)
                .with_context(|| format!("Failed to parse argspec {spec:?}"))?;
            arrange(&mut args, &settings);

            if json {
                print_json(&args, arch)?;
            } else {
                for arg in &args {
                    println!(
                        "{:<8} {:<12} size {:<3} {}",
                        arg.index,
                        arg.format,
                        arg.size,
                        location_text(arg, arch),
                    );
                }
            }
        }
        Commands::Registers { arch } => {
            println!("int:   {}", arch.bank_names(Bank::Int).join(" "));
            println!("float: {}", arch.bank_names(Bank::Float).join(" "));
        }
    }

    Ok(())
}

fn location_text(arg: &ArgSpec, arch: Arch) -> String {
    match &arg.placement {
        Placement::Register(reg) => reg_name(arch, *reg),
        Placement::Stack(ofs) => format!("stack+{ofs}"),
        Placement::StructRegs(regs) => {
            let names: Vec<_> = regs.iter().map(|&r| reg_name(arch, r)).collect();
            format!("regs[{}]", names.join(" "))
        }
        Placement::AutoInt | Placement::AutoFloat => "auto".to_owned(),
    }
}

fn reg_name(arch: Arch, reg: argtrace::RegId) -> String {
    arch.register_name(reg).unwrap_or("?").to_owned()
}

fn print_json(args: &[ArgSpec], arch: Arch) -> Result<()> {
    let entries: Vec<_> = args
        .iter()
        .map(|arg| {
            let location = match &arg.placement {
                Placement::Register(reg) => serde_json::json!({ "register": reg_name(arch, *reg) }),
                Placement::Stack(ofs) => serde_json::json!({ "stack": ofs }),
                Placement::StructRegs(regs) => serde_json::json!({
                    "registers": regs.iter().map(|&r| reg_name(arch, r)).collect::<Vec<_>>()
                }),
                Placement::AutoInt | Placement::AutoFloat => serde_json::json!("auto"),
            };
            serde_json::json!({
                "index": arg.index.to_string(),
                "format": arg.format.to_string(),
                "size": arg.size,
                "location": location,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}
