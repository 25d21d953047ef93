//! # Commands Module
//!
//! Cashier commands read from stdin, one per line.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── You are here (parsing + dispatch)
//! ├── product.rs  ◄─── search, add
//! ├── cart.rs     ◄─── qty, inc, dec, discount, remove, order-discount,
//! │                    tax, tax-rate, show, clear
//! └── sale.rs     ◄─── pay, cancel, confirm, sales
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Command Flow                                         │
//! │                                                                         │
//! │  stdin: discount 1 20.00                                               │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  parse_command() ──► Command::Discount { line: 1, amount: $20.00 }     │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  execute(command, &mut session, &config)                                │
//! │         │                                                               │
//! │         ├── Ok(Outcome::Continue(text)) ──► printed                    │
//! │         ├── Ok(Outcome::Quit)           ──► loop ends                  │
//! │         └── Err(TerminalError)          ──► printed as "! message"     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lines are referenced by their 1-based position as shown by `show`.

pub mod cart;
pub mod product;
pub mod sale;

use std::str::FromStr;

use till_core::{Money, PaymentMethod, TaxRate};
use tracing::debug;

use crate::error::{TerminalError, TerminalResult};
use crate::state::{PosSession, SaleStore, TerminalConfig};

/// A parsed cashier command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Search(String),
    Add(String),
    Qty { line: usize, quantity: i64 },
    Inc(usize),
    Dec(usize),
    Discount { line: usize, amount: Money },
    Remove(usize),
    OrderDiscount(Money),
    Tax(Money),
    TaxRate(TaxRate),
    Show { json: bool },
    Pay,
    Cancel,
    Confirm {
        method: PaymentMethod,
        tendered: Option<Money>,
        customer_name: Option<String>,
        customer_phone: Option<String>,
    },
    Clear,
    Sales,
    Help,
    Quit,
}

/// What the loop does after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue(String),
    Quit,
}

pub const HELP: &str = "\
Commands:
  search <query>                  find products by name, SKU or barcode
  add <barcode|sku|product-id>    add one unit
  qty <line> <n>                  set quantity
  inc <line> / dec <line>         step quantity up or down
  discount <line> <amount>        set line discount
  remove <line>                   remove a line
  order-discount <amount>         discount on the whole order
  tax <amount>                    order tax as a fixed amount
  tax-rate <percent>              order tax as a percentage
  show [json]                     show the cart
  pay                             open payment
  cancel                          close payment, keep the cart
  confirm cash <tendered> [name] [phone]
  confirm card|mobile [name] [phone]
  clear                           empty the cart
  sales                           recent sales
  help / quit";

/// Splits a line on whitespace, keeping double-quoted runs together.
pub fn tokenize(input: &str) -> TerminalResult<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in input.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if in_quotes {
        return Err(TerminalError::usage("Unclosed quote"));
    }
    if has_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_command(input: &str) -> TerminalResult<Option<Command>> {
    let tokens = tokenize(input)?;
    let Some((name, args)) = tokens.split_first() else {
        return Ok(None);
    };

    let command = match name.to_lowercase().as_str() {
        "search" | "find" => {
            if args.is_empty() {
                return Err(TerminalError::usage("Usage: search <query>"));
            }
            Command::Search(args.join(" "))
        }
        "add" | "scan" => Command::Add(one(args, "add <barcode|sku|product-id>")?.to_string()),
        "qty" => {
            let [line, quantity] = two(args, "qty <line> <n>")?;
            Command::Qty {
                line: parse_line(line)?,
                quantity: parse_int(quantity)?,
            }
        }
        "inc" | "+" => Command::Inc(parse_line(one(args, "inc <line>")?)?),
        "dec" | "-" => Command::Dec(parse_line(one(args, "dec <line>")?)?),
        "discount" => {
            let [line, amount] = two(args, "discount <line> <amount>")?;
            Command::Discount {
                line: parse_line(line)?,
                amount: Money::parse(amount)?,
            }
        }
        "remove" | "rm" => Command::Remove(parse_line(one(args, "remove <line>")?)?),
        "order-discount" => {
            Command::OrderDiscount(Money::parse(one(args, "order-discount <amount>")?)?)
        }
        "tax" => Command::Tax(Money::parse(one(args, "tax <amount>")?)?),
        "tax-rate" => {
            Command::TaxRate(TaxRate::parse_percentage(one(args, "tax-rate <percent>")?)?)
        }
        "show" | "cart" => match args {
            [] => Command::Show { json: false },
            [flag] if flag == "json" || flag == "--json" => Command::Show { json: true },
            _ => return Err(TerminalError::usage("Usage: show [json]")),
        },
        "pay" => Command::Pay,
        "cancel" => Command::Cancel,
        "confirm" => parse_confirm(args)?,
        "clear" => Command::Clear,
        "sales" => Command::Sales,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => {
            return Err(TerminalError::usage(format!(
                "Unknown command '{}', type 'help'",
                other
            )))
        }
    };

    Ok(Some(command))
}

fn parse_confirm(args: &[String]) -> TerminalResult<Command> {
    const USAGE: &str = "Usage: confirm cash <tendered> [name] [phone] | confirm card|mobile [name] [phone]";

    let Some((method, rest)) = args.split_first() else {
        return Err(TerminalError::usage(USAGE));
    };
    let method = PaymentMethod::from_str(method)?;

    let (tendered, rest) = if method.requires_tender() {
        match rest.split_first() {
            Some((amount, rest)) => (Some(Money::parse(amount)?), rest),
            None => return Err(TerminalError::usage(USAGE)),
        }
    } else {
        (None, rest)
    };

    if rest.len() > 2 {
        return Err(TerminalError::usage(USAGE));
    }

    Ok(Command::Confirm {
        method,
        tendered,
        customer_name: rest.first().cloned(),
        customer_phone: rest.get(1).cloned(),
    })
}

fn one<'a>(args: &'a [String], usage: &str) -> TerminalResult<&'a str> {
    match args {
        [arg] => Ok(arg.as_str()),
        _ => Err(TerminalError::usage(format!("Usage: {}", usage))),
    }
}

fn two<'a>(args: &'a [String], usage: &str) -> TerminalResult<[&'a str; 2]> {
    match args {
        [a, b] => Ok([a.as_str(), b.as_str()]),
        _ => Err(TerminalError::usage(format!("Usage: {}", usage))),
    }
}

fn parse_line(raw: &str) -> TerminalResult<usize> {
    raw.parse::<usize>()
        .map_err(|_| TerminalError::validation(format!("'{}' is not a line number", raw)))
}

fn parse_int(raw: &str) -> TerminalResult<i64> {
    raw.parse::<i64>()
        .map_err(|_| TerminalError::validation(format!("'{}' is not a whole number", raw)))
}

/// Runs one command against the session.
pub async fn execute<S: SaleStore>(
    command: Command,
    session: &mut PosSession<S>,
    config: &TerminalConfig,
) -> TerminalResult<Outcome> {
    debug!(?command, "execute command");

    let text = match command {
        Command::Search(query) => product::search(session, config, &query).await?,
        Command::Add(code) => product::add(session, config, &code).await?,
        Command::Qty { line, quantity } => cart::set_quantity(session, config, line, quantity)?,
        Command::Inc(line) => cart::step(session, config, line, true)?,
        Command::Dec(line) => cart::step(session, config, line, false)?,
        Command::Discount { line, amount } => cart::set_discount(session, config, line, amount)?,
        Command::Remove(line) => cart::remove(session, config, line)?,
        Command::OrderDiscount(amount) => cart::set_order_discount(session, config, amount)?,
        Command::Tax(amount) => cart::set_order_tax(session, config, amount)?,
        Command::TaxRate(rate) => cart::set_tax_rate(session, config, rate)?,
        Command::Show { json: false } => cart::show(session, config),
        Command::Show { json: true } => cart::cart_json(session.cart())?,
        Command::Clear => cart::clear(session),
        Command::Pay => sale::pay(session, config)?,
        Command::Cancel => sale::cancel(session)?,
        Command::Confirm {
            method,
            tendered,
            customer_name,
            customer_phone,
        } => {
            sale::confirm(
                session,
                config,
                method,
                tendered,
                customer_name.as_deref(),
                customer_phone.as_deref(),
            )
            .await?
        }
        Command::Sales => sale::recent(session, config).await?,
        Command::Help => HELP.to_string(),
        Command::Quit => return Ok(Outcome::Quit),
    };

    Ok(Outcome::Continue(text))
}
