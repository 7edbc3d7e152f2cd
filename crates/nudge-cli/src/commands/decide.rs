//! Interactive purchase decision
//!
//! Reads answers line by line so the flow can be driven from a terminal or
//! from a script. End of input abandons the decision without saving.

use std::io::{BufRead, Write};

use anyhow::Result;
use nudge_core::ai::FinancialCoach;
use nudge_core::auth::LocalAuth;
use nudge_core::db::Database;
use nudge_core::models::{Category, Verdict};
use nudge_core::workflow::{parse_amount, DecisionWorkflow};
use nudge_core::Error;

/// Read one line; None at end of input
fn ask<R: BufRead, W: Write>(input: &mut R, out: &mut W, label: &str) -> Result<Option<String>> {
    write!(out, "{}", label)?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Yes unless the answer starts with 'n'; end of input means no
fn confirm<R: BufRead, W: Write>(input: &mut R, out: &mut W, label: &str) -> Result<bool> {
    Ok(match ask(input, out, label)? {
        Some(answer) => !answer.trim().to_lowercase().starts_with('n'),
        None => false,
    })
}

/// Accept a menu number or a category name
pub fn parse_category_choice(input: &str) -> Option<Category> {
    let trimmed = input.trim();
    if let Ok(n) = trimmed.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| Category::all().get(i)).copied();
    }
    trimmed.parse().ok()
}

fn verdict_badge(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Positive => "✅ Positive",
        Verdict::Neutral => "🤔 Neutral",
        Verdict::Negative => "🛑 Negative",
    }
}

fn abandoned<W: Write>(out: &mut W) -> Result<Option<i64>> {
    writeln!(out)?;
    writeln!(out, "Decision abandoned. Nothing was saved.")?;
    Ok(None)
}

/// Run one decision from planning to save; returns the new record id
pub async fn cmd_decide<R: BufRead, W: Write>(
    db: &Database,
    auth: &LocalAuth,
    coach: &FinancialCoach,
    input: &mut R,
    out: &mut W,
) -> Result<Option<i64>> {
    let mut wf = DecisionWorkflow::new();

    // Step 1: what and how much
    writeln!(out, "🛒 Step 1 of 3: What are you thinking of buying?")?;
    let menu = Category::all()
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}) {}", i + 1, c))
        .collect::<Vec<_>>()
        .join("  ");

    'input: loop {
        let Some(item) = ask(input, out, "   Item: ")? else {
            return abandoned(out);
        };
        wf.set_item(&item)?;

        let Some(amount) = ask(input, out, "   Amount: $")? else {
            return abandoned(out);
        };
        wf.set_amount(&amount)?;

        writeln!(out, "   {}", menu)?;
        let Some(choice) = ask(input, out, "   Category: ")? else {
            return abandoned(out);
        };
        if let Some(category) = parse_category_choice(&choice) {
            wf.set_category(category)?;
        }

        writeln!(out, "   Thinking of some questions...")?;
        loop {
            match wf.request_questions(coach).await {
                Ok(()) => break 'input,
                Err(Error::Validation(msg)) => {
                    writeln!(out, "   ⚠️  {}", msg)?;
                    continue 'input;
                }
                Err(e) if e.is_ai_failure() => {
                    writeln!(out, "   ❌ Could not generate questions: {}", e)?;
                    if !confirm(input, out, "   Try again? [Y/n] ")? {
                        return abandoned(out);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    // Step 2: reflect
    writeln!(out)?;
    writeln!(out, "🤔 Step 2 of 3: Take a moment to reflect.")?;
    'answers: loop {
        let questions = wf.state().questions.clone();
        for (i, question) in questions.iter().enumerate() {
            writeln!(out, "   {}. {}", i + 1, question)?;
            let Some(answer) = ask(input, out, "      > ")? else {
                return abandoned(out);
            };
            wf.set_answer(i, &answer)?;
        }

        writeln!(out, "   Weighing your answers...")?;
        loop {
            match wf.request_verdict(coach).await {
                Ok(()) => break 'answers,
                Err(Error::Validation(msg)) => {
                    writeln!(out, "   ⚠️  {}", msg)?;
                    continue 'answers;
                }
                Err(e) if e.is_ai_failure() => {
                    writeln!(out, "   ❌ Could not get a verdict: {}", e)?;
                    if !confirm(input, out, "   Try again? [Y/n] ")? {
                        return abandoned(out);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    // Step 3: verdict and outcome
    writeln!(out)?;
    writeln!(out, "📋 Step 3 of 3: The verdict")?;
    if let Some(verdict) = wf.state().verdict {
        writeln!(out, "   {}", verdict_badge(verdict))?;
    }
    if let Some(suggestion) = &wf.state().suggestion {
        writeln!(out, "   💡 {}", suggestion)?;
    }
    let planned_amount = wf.state().planned.as_ref().map(|p| p.amount).unwrap_or(0.0);

    'outcome: loop {
        let Some(label) = ask(input, out, "   What did you end up doing? ")? else {
            return abandoned(out);
        };
        wf.set_final_label(&label)?;
        let Some(amount) = ask(input, out, "   How much did you actually spend? $")? else {
            return abandoned(out);
        };
        wf.set_final_amount(&amount)?;
        let spent = parse_amount(&wf.state().final_amount).unwrap_or(0.0);

        loop {
            match wf.finalize_and_save(db, auth) {
                Ok(id) => {
                    writeln!(out)?;
                    let saved = planned_amount - spent;
                    if saved > 0.0 {
                        writeln!(out, "💰 Saved! You kept ${:.2} in your pocket.", saved)?;
                    } else {
                        writeln!(out, "✅ Saved.")?;
                    }
                    return Ok(Some(id));
                }
                Err(Error::Validation(msg)) => {
                    writeln!(out, "   ⚠️  {}", msg)?;
                    continue 'outcome;
                }
                Err(e) if e.is_retryable_save() => {
                    writeln!(out, "   ❌ {}", e)?;
                    if !confirm(input, out, "   Retry saving? [Y/n] ")? {
                        return abandoned(out);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
