//! Operator console: menu loop that drains the event store for display and sends test messages.
//!
//! Runs on its own blocking thread, reading lines from `input`. Sends are driven to
//! completion on the runtime handle, so the console never shares anything with the
//! webhook handlers except the store.

use crate::channels::OutboundSender;
use crate::display::{format_message, format_status};
use crate::store::EventStore;
use anyhow::Result;
use std::io::{BufRead, Write};
use std::sync::Arc;
use tokio::runtime::Handle;

pub const NOTHING_NEW: &str = "No new messages.";

/// Outcome of one menu choice.
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Continue,
    Exit,
}

pub struct Console<R, W> {
    store: Arc<EventStore>,
    sender: Arc<dyn OutboundSender>,
    test_recipient: Option<String>,
    runtime: Handle,
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(
        store: Arc<EventStore>,
        sender: Arc<dyn OutboundSender>,
        test_recipient: Option<String>,
        runtime: Handle,
        input: R,
        output: W,
    ) -> Self {
        Self {
            store,
            sender,
            test_recipient,
            runtime,
            input,
            output,
        }
    }

    /// Loop until the operator exits or input ends. Must not be called from an async context.
    pub fn run(&mut self) -> Result<()> {
        loop {
            write!(
                self.output,
                "\nOptions:\n  1. Show new messages\n  2. Send a message (test mode)\n  3. Exit\nChoose an option: "
            )?;
            self.output.flush()?;
            let Some(choice) = self.read_line()? else {
                break;
            };
            if self.dispatch(choice.trim())? == Step::Exit {
                break;
            }
        }
        writeln!(self.output, "Exiting.")?;
        Ok(())
    }

    fn dispatch(&mut self, choice: &str) -> Result<Step> {
        match choice {
            "1" => self.show_new_events()?,
            "2" => {
                if !self.send_test_message()? {
                    return Ok(Step::Exit);
                }
            }
            "3" => return Ok(Step::Exit),
            _ => writeln!(self.output, "Invalid option. Try again.")?,
        }
        Ok(Step::Continue)
    }

    /// One line without its terminator; None at end of input.
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{}", label)?;
        self.output.flush()?;
        self.read_line()
    }

    /// Drain both buffers and render them, messages first.
    pub fn show_new_events(&mut self) -> Result<()> {
        let messages = self.store.drain_messages();
        let statuses = self.store.drain_statuses();
        if messages.is_empty() && statuses.is_empty() {
            writeln!(self.output, "\n{}", NOTHING_NEW)?;
            return Ok(());
        }
        for m in &messages {
            writeln!(self.output, "{}", format_message(m))?;
        }
        for s in &statuses {
            writeln!(self.output, "{}", format_status(s))?;
        }
        Ok(())
    }

    /// Returns false when input ended mid-prompt.
    fn send_test_message(&mut self) -> Result<bool> {
        let recipient = match self.test_recipient.clone() {
            Some(r) => {
                writeln!(self.output, "Sending to: {} (test mode)", r)?;
                r
            }
            None => {
                let Some(r) = self.prompt("Recipient number: ")? else {
                    return Ok(false);
                };
                let r = r.trim().to_string();
                if r.is_empty() {
                    writeln!(self.output, "No recipient given, nothing sent.")?;
                    return Ok(true);
                }
                r
            }
        };
        let Some(text) = self.prompt("Enter your message: ")? else {
            return Ok(false);
        };
        if text.trim().is_empty() {
            writeln!(self.output, "Message is empty, nothing sent.")?;
            return Ok(true);
        }

        writeln!(self.output, "Sending message to {}...", recipient)?;
        let sender = self.sender.clone();
        match self.runtime.block_on(sender.send_text(&recipient, &text)) {
            Ok(receipt) => match receipt.message_id {
                Some(id) => writeln!(
                    self.output,
                    "✅ Message sent to {} (id {}).",
                    receipt.recipient, id
                )?,
                None => writeln!(self.output, "✅ Message sent to {}.", receipt.recipient)?,
            },
            Err(e) => writeln!(self.output, "❌ Error sending message: {}", e)?,
        }
        Ok(true)
    }
}
