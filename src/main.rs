//! settlement-engine CLI
//!
//! Compute balances and a settlement plan for a trip from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Settle a trip described in a JSON file
//! settlement-engine settle --input trip.json
//!
//! # Override the ambient rate and output JSON
//! settlement-engine settle --input trip.json --rate 110 --format json
//!
//! # Repair transactions that reference removed members before settling
//! settlement-engine settle --input trip.json --repair
//!
//! # Generate a random trip for testing
//! settlement-engine generate --members 4 --transactions 20
//! ```

use settlement_engine::core::currency::{Currency, CurrencyPair, ExchangeRate};
use settlement_engine::core::group::Group;
use settlement_engine::core::member::MemberId;
use settlement_engine::core::transaction::{Transaction, TransactionKind};
use settlement_engine::engine::aggregation::AggregationError;
use settlement_engine::engine::evaluation::{EngineError, Evaluation, SettlementEngine};
use settlement_engine::simulation::stress_test::{generate_random_trip, TripConfig};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fs;
use std::process;

/// Ambient rate used when neither the input file nor `--rate` sets one.
const DEFAULT_AMBIENT_RATE: Decimal = dec!(115);

fn print_usage() {
    eprintln!(
        r#"settlement-engine — shared-expense balances and debt settlement

USAGE:
    settlement-engine <COMMAND> [OPTIONS]

COMMANDS:
    settle      Compute balances and the settlement plan of a trip
    generate    Generate a random trip (for testing)
    help        Show this message

OPTIONS (settle):
    --input <FILE>      Path to JSON trip file
    --rate <RATE>       Ambient rate: secondary units per primary unit
                        (overrides the file; default 115)
    --format <FORMAT>   Output format: text (default) or json
    --repair            Remap payers/splits that reference non-members

OPTIONS (generate):
    --members <N>       Number of members (default: 4)
    --transactions <N>  Number of transactions (default: 20)
    --output <FILE>     Write to file instead of stdout

EXAMPLES:
    settlement-engine settle --input trip.json
    settlement-engine settle --input trip.json --rate 110 --format json
    settlement-engine generate --members 6 --transactions 40 --output trip.json

Set RUST_LOG=debug for engine diagnostics."#
    );
}

/// JSON schema for a trip.
#[derive(serde::Serialize, serde::Deserialize)]
struct TripFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default)]
    currencies: CurrencyPair,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ambient_rate: Option<String>,
    members: Vec<String>,
    #[serde(default)]
    transactions: Vec<TransactionInput>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct TransactionInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    currency: Option<String>,
    #[serde(default)]
    kind: TransactionKind,
    paid_by: String,
    #[serde(default)]
    split_among: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exchange_rate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<NaiveDate>,
}

/// JSON output schema for a settlement.
#[derive(serde::Serialize)]
struct SettleOutput {
    reference_currency: String,
    ambient_rate: String,
    total_expense: String,
    total_income: String,
    net_total: String,
    balances: Vec<BalanceOutput>,
    settlements: Vec<SettlementOutput>,
}

#[derive(serde::Serialize)]
struct BalanceOutput {
    member: String,
    paid: String,
    balance: String,
    status: String,
}

#[derive(serde::Serialize)]
struct SettlementOutput {
    from: String,
    to: String,
    amount: String,
}

struct LoadedTrip {
    currencies: CurrencyPair,
    ambient_rate: Option<ExchangeRate>,
    members: Vec<MemberId>,
    transactions: Vec<Transaction>,
}

fn parse_rate(raw: &str, context: &str) -> ExchangeRate {
    let value: Decimal = raw.trim().parse().unwrap_or_else(|e| {
        eprintln!("Invalid {} '{}': {}", context, raw, e);
        process::exit(1);
    });
    ExchangeRate::new(value).unwrap_or_else(|e| {
        eprintln!("Invalid {}: {}", context, e);
        process::exit(1);
    })
}

fn load_trip(path: &str, repair: bool) -> LoadedTrip {
    let content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {}", path, e);
        process::exit(1);
    });

    let file: TripFile = serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("Error parsing JSON: {}", e);
        eprintln!("Expected format:");
        eprintln!(
            r#"{{
  "currencies": {{ "primary": "SGD", "secondary": "JPY" }},
  "ambient_rate": "115",
  "members": ["Alice", "Bob"],
  "transactions": [
    {{ "description": "Udon", "amount": "8250", "currency": "JPY", "paid_by": "Alice", "split_among": ["Alice", "Bob"] }}
  ]
}}"#
        );
        process::exit(1);
    });

    let ambient_rate = file
        .ambient_rate
        .as_deref()
        .map(|raw| parse_rate(raw, "ambient_rate"));

    let mut transactions = Vec::with_capacity(file.transactions.len());
    for (i, input) in file.transactions.into_iter().enumerate() {
        let amount: Decimal = input.amount.trim().parse().unwrap_or_else(|e| {
            eprintln!("Transaction #{}: invalid amount '{}': {}", i, input.amount, e);
            process::exit(1);
        });
        let currency = match input.currency.as_deref() {
            Some(code) => file.currencies.resolve(code).unwrap_or_else(|e| {
                eprintln!("Transaction #{}: {}", i, e);
                process::exit(1);
            }),
            None => Currency::Primary,
        };
        let mut tx = Transaction::try_new(input.kind, MemberId::new(input.paid_by), amount, currency)
            .unwrap_or_else(|e| {
                eprintln!("Transaction #{}: {}", i, e);
                process::exit(1);
            })
            .with_split(input.split_among.into_iter().map(MemberId::from));

        // A zero snapshot means "no snapshot captured".
        if let Some(raw) = input.exchange_rate {
            let value: Decimal = raw.trim().parse().unwrap_or_else(|e| {
                eprintln!("Transaction #{}: invalid exchange_rate '{}': {}", i, raw, e);
                process::exit(1);
            });
            if !value.is_zero() {
                let rate = ExchangeRate::new(value).unwrap_or_else(|e| {
                    eprintln!("Transaction #{}: {}", i, e);
                    process::exit(1);
                });
                tx = tx.with_exchange_rate(rate);
            }
        }
        if let Some(description) = input.description {
            tx = tx.with_description(description);
        }
        if let Some(date) = input.date {
            tx = tx.with_date(date);
        }
        transactions.push(tx);
    }

    let (members, transactions) = if repair {
        let mut group = Group::new(file.name.unwrap_or_default(), &file.members);
        for tx in transactions {
            group.add_transaction(tx);
        }
        (
            group.members().to_vec(),
            group.transactions().transactions().to_vec(),
        )
    } else {
        (
            file.members.into_iter().map(MemberId::from).collect(),
            transactions,
        )
    };

    LoadedTrip {
        currencies: file.currencies,
        ambient_rate,
        members,
        transactions,
    }
}

fn status(balance: Decimal) -> &'static str {
    if balance > Decimal::ZERO {
        "CREDITOR"
    } else if balance < Decimal::ZERO {
        "DEBTOR"
    } else {
        "SETTLED"
    }
}

fn print_text(eval: &Evaluation, currencies: &CurrencyPair, rate: ExchangeRate) {
    let code = currencies.code(Currency::Primary);
    let agg = &eval.aggregate;

    println!("=== Settlement ({}) ===", code);
    println!("Rate:           {} {} = 1 {}", rate, currencies.secondary, code);
    println!("Total Expense:  {} {}", agg.total_expense.round_dp(2), code);
    println!("Total Income:   {} {}", agg.total_income.round_dp(2), code);
    println!("Net Total:      {} {}", agg.net_total.round_dp(2), code);

    println!("\n━━━ Balances ━━━\n");
    for b in &agg.balances {
        println!(
            "  {:<15} paid {:>12} {}  balance {:>12} {}  [{}]",
            b.member.as_str(),
            b.paid.round_dp(2),
            code,
            b.balance.round_dp(2),
            code,
            status(b.balance.round_dp(2))
        );
    }

    println!("\n━━━ Settlements ━━━\n");
    if eval.plan.is_empty() {
        println!("  All settled up.");
    }
    for s in &eval.plan {
        println!("  {} → {}: {} {}", s.from, s.to, s.amount.round_dp(2), code);
    }
}

fn print_json(eval: &Evaluation, currencies: &CurrencyPair, rate: ExchangeRate) {
    let agg = &eval.aggregate;
    let output = SettleOutput {
        reference_currency: currencies.primary.clone(),
        ambient_rate: rate.to_string(),
        total_expense: agg.total_expense.to_string(),
        total_income: agg.total_income.to_string(),
        net_total: agg.net_total.to_string(),
        balances: agg
            .balances
            .iter()
            .map(|b| BalanceOutput {
                member: b.member.to_string(),
                paid: b.paid.to_string(),
                balance: b.balance.to_string(),
                status: status(b.balance.round_dp(2)).to_string(),
            })
            .collect(),
        settlements: eval
            .plan
            .transfers()
            .iter()
            .map(|s| SettlementOutput {
                from: s.from.to_string(),
                to: s.to.to_string(),
                amount: s.amount.to_string(),
            })
            .collect(),
    };

    let json = serde_json::to_string_pretty(&output).unwrap_or_else(|e| {
        eprintln!("Error serializing output: {}", e);
        process::exit(1);
    });
    println!("{}", json);
}

fn cmd_settle(args: &[String]) {
    let mut input_path = None;
    let mut format = "text".to_string();
    let mut rate_override = None;
    let mut repair = false;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                i += 1;
                input_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--input requires a file path");
                    process::exit(1);
                }));
            }
            "--format" => {
                i += 1;
                format = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--format requires 'text' or 'json'");
                    process::exit(1);
                });
            }
            "--rate" => {
                i += 1;
                let raw = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--rate requires a positive number");
                    process::exit(1);
                });
                rate_override = Some(parse_rate(&raw, "--rate"));
            }
            "--repair" => repair = true,
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let path = input_path.unwrap_or_else(|| {
        eprintln!("Error: --input <FILE> is required");
        process::exit(1);
    });

    let trip = load_trip(&path, repair);
    let rate = match rate_override.or(trip.ambient_rate) {
        Some(rate) => rate,
        None => ExchangeRate::new(DEFAULT_AMBIENT_RATE).unwrap_or_else(|e| {
            eprintln!("Invalid default rate: {}", e);
            process::exit(1);
        }),
    };

    let eval = SettlementEngine::evaluate(&trip.members, &trip.transactions, rate)
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            if let EngineError::Aggregation(AggregationError::InvalidMember { .. }) = e {
                eprintln!("Hint: pass --repair to remap transactions onto current members.");
            }
            process::exit(1);
        });

    if format == "json" {
        print_json(&eval, &trip.currencies, rate);
    } else {
        print_text(&eval, &trip.currencies, rate);
    }
}

fn cmd_generate(args: &[String]) {
    let mut config = TripConfig::default();
    let mut output_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--members" => {
                i += 1;
                config.member_count = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| {
                        eprintln!("--members requires a number");
                        process::exit(1);
                    });
            }
            "--transactions" => {
                i += 1;
                config.transaction_count = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| {
                        eprintln!("--transactions requires a number");
                        process::exit(1);
                    });
            }
            "--output" => {
                i += 1;
                output_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--output requires a file path");
                    process::exit(1);
                }));
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let group = generate_random_trip(&config);
    let currencies = CurrencyPair::default();

    let output = TripFile {
        name: Some(group.name().to_string()),
        ambient_rate: Some(DEFAULT_AMBIENT_RATE.to_string()),
        members: group.members().iter().map(|m| m.to_string()).collect(),
        transactions: group
            .transactions()
            .transactions()
            .iter()
            .map(|tx| TransactionInput {
                description: tx.description().map(str::to_string),
                amount: tx.amount().to_string(),
                currency: Some(currencies.code(tx.currency()).to_string()),
                kind: tx.kind(),
                paid_by: tx.paid_by().to_string(),
                split_among: tx.split_among().iter().map(|m| m.to_string()).collect(),
                exchange_rate: tx.exchange_rate().map(|r| r.to_string()),
                date: Some(tx.date()),
            })
            .collect(),
        currencies,
    };

    let json = serde_json::to_string_pretty(&output).unwrap_or_else(|e| {
        eprintln!("Error serializing trip: {}", e);
        process::exit(1);
    });

    if let Some(path) = output_path {
        fs::write(&path, &json).unwrap_or_else(|e| {
            eprintln!("Error writing to '{}': {}", path, e);
            process::exit(1);
        });
        eprintln!(
            "Generated {} transactions across {} members → {}",
            group.transactions().len(),
            group.members().len(),
            path
        );
    } else {
        println!("{}", json);
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "settle" => cmd_settle(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
