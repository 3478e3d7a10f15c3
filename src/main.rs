use clap::Parser;
use log::{error, LevelFilter};
use pow_ledger::cli::{block_text, blocks_json};
use pow_ledger::{validate_address, Blockchain, Command, Config, Opt, UTXOSet, Wallets};
use std::process;

fn main() {
    // I log at info by default; RUST_LOG still overrides it
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();

    // I run the command and turn any failure into a logged error and a non-zero exit

    if let Err(e) = run(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

// I reject malformed addresses before touching the store
fn check_address(role: &str, address: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !validate_address(address) {
        return Err(format!("Invalid {role} address: {address}").into());
    }
    Ok(())
}

fn run(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    // I load the settings once and hand the paths down explicitly
    let config = Config::load(opt.config.as_deref())?;

    match opt.command {
        Command::Createblockchain { address } => {
            check_address("genesis", &address)?;
            // I mine the genesis block only if the store has no chain yet
            let blockchain = Blockchain::open(&config.db_path, &address)?;
            println!("Done! Tip: {}", blockchain.get_tip_hash()?);
        }
        Command::Createwallet => {
            let mut wallets = Wallets::load_from_file(&config.wallet_file)?;
            let address = wallets.create_wallet()?;
            // I save right away so later invocations can sign with this key
            wallets.save_to_file(&config.wallet_file)?;
            println!("Your new address: {address}")
        }
        Command::GetBalance { address } => {
            check_address("wallet", &address)?;
            let blockchain = Blockchain::load(&config.db_path)?;
            // I replay the chain to sum every unspent output this address owns
            let balance = UTXOSet::new(&blockchain).get_balance(&address)?;
            println!("Balance of {address}: {balance}");
        }
        Command::ListAddresses => {
            let wallets = Wallets::load_from_file(&config.wallet_file)?;
            for address in wallets.get_addresses() {
                println!("{address}")
            }
        }
        Command::Send {
            from,
            to,
            amount,
            miner,
        } => {
            check_address("sender", &from)?;
            check_address("recipient", &to)?;
            // I pay the reward to --miner, then the configured address, then the sender
            let miner = miner
                .or_else(|| config.mining_address.clone())
                .unwrap_or_else(|| from.clone());
            check_address("miner", &miner)?;

            let wallets = Wallets::load_from_file(&config.wallet_file)?;
            let wallet = wallets
                .get_wallet(&from)
                .ok_or_else(|| format!("No local wallet for {from}"))?;

            let blockchain = Blockchain::load(&config.db_path)?;
            let block = blockchain.send(wallet, &to, amount, &miner)?;
            println!("Success! Mined block {}", block.get_hash());
        }
        Command::Printchain { json } => {
            let blocks = Blockchain::load(&config.db_path)?.all_blocks()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&blocks_json(&blocks))?);
            } else {
                for block in &blocks {
                    println!("{}", block_text(block)?);
                }
            }
        }
    }
    Ok(())
}
