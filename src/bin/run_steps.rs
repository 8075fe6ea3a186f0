//! Run a multi-step simulation from the default seasoned portfolio
//!
//! Prints a monthly summary table for comparison against an external model.

use std::time::Instant;

use banksim_core::{initial_seasoned_portfolio, step, Config};

fn main() {
    env_logger::init();

    let start = Instant::now();
    println!("banksim-core v0.1.0");
    println!("===================\n");

    let config = Config::default();
    let mut state = initial_seasoned_portfolio(&config, None).expect("failed to build opening portfolio");
    println!("Opening portfolio built in {:?}", start.elapsed());
    println!(
        "  assets={:.0} liabilities={:.0} cet1={:.0} cet1Ratio={:.4}",
        state.balance_sheet.total_assets(),
        state.balance_sheet.total_liabilities(),
        state.capital.cet1,
        state.risk_metrics.cet1_ratio,
    );

    println!(
        "\n{:>5} {:>14} {:>14} {:>14} {:>8} {:>8} {:>8}",
        "step", "assets", "cet1", "netIncome", "cet1R", "lcr", "nsfr"
    );

    let months = 36;
    for _ in 0..months {
        let (next, events) = step(&state, &config, &[], &[]).expect("step failed");
        for event in &events {
            log::warn!("{:?}: {}", event.severity, event.message);
        }
        println!(
            "{:>5} {:>14.0} {:>14.0} {:>14.0} {:>8.4} {:>8.4} {:>8.4}",
            next.clock.step,
            next.balance_sheet.total_assets(),
            next.capital.cet1,
            next.income_statement.net_income,
            next.risk_metrics.cet1_ratio,
            next.risk_metrics.lcr,
            next.risk_metrics.nsfr,
        );
        state = next;
        if state.status.has_failed {
            println!("bank failed at step {}", state.clock.step);
            break;
        }
    }

    println!("\nDone in {:?}", start.elapsed());
}
