//! Basic example of using the cryptogram engine

use cryptogram_core::{InputEvent, Letter, MockPuzzleService, Notification, PuzzleService, Session};

fn main() {
    let service = MockPuzzleService::with_puzzle(
        "XIBBO, RHW!",
        "A. Nonymous",
        "HELLO, YOU!",
    );

    println!("Fetching a puzzle from the {} service...\n", service.backend_name());
    let mut session = match Session::start(&service) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {}", e);
            return;
        }
    };

    println!("Ciphertext: XIBBO, RHW!");
    println!("Author:     {}\n", session.engine().author());

    // Type guesses; the cursor jumps to the next unfilled cell after each one
    for c in "HELOYOU".chars() {
        let Some(letter) = Letter::from_char(c) else {
            continue;
        };
        if let Err(e) = session.press(InputEvent::Letter(letter)) {
            println!("  {}", e);
        }
        println!("  typed {} -> {}", c, session.engine().guessed_text());
    }

    service.set_correct(true);
    if let Err(e) = session.press(InputEvent::Submit) {
        println!("Check failed: {}", e);
    }

    for notification in session.engine_mut().drain_notifications() {
        if let Notification::Feedback(feedback) = notification {
            println!("[{:?}] {}", feedback.tone, feedback.text);
        }
    }
}
