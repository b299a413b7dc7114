use std::io::{self, Write};

use ledger::{
    machine_id::{IdentityConfig, MachineIdResetter},
    terminal,
};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut stdout = io::stdout();
    terminal::banner(&mut stdout, "🔄 machine id reset")?;

    let resetter = MachineIdResetter::new(&IdentityConfig::from_env()?)?;
    resetter.reset_machine_ids(&mut stdout);

    writeln!(stdout)?;
    terminal::rule(&mut stdout)?;
    terminal::wait_for_keypress(&mut stdout, "ℹ️ press any key to exit...")?;
    Ok(())
}
