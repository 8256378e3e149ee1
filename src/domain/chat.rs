pub const WALLET_REPLY: &str = "Your wallet currently holds 100.00 USDC and 0.5 ETH on Base-Sepolia. That covers roughly 400 kWh at today's average crypto rate.";
pub const STATION_REPLY: &str = "There are several ChargeX stations around Bangalore. Open the station list to see which ones are available right now, along with their power rating and price.";
pub const PAYMENT_REPLY: &str = "Charging is paid in USDC on Base-Sepolia. Once you start a session I prepare the payment request and settle it for you before energy starts flowing.";
pub const CHARGE_REPLY: &str = "To start charging, pick an available station, confirm how many kWh you need and approve the payment. I will keep you posted on progress.";
pub const BATTERY_REPLY: &str = "A typical session from 20% to 80% takes around 45 minutes on a 150 kW charger. I recommend topping up before your battery drops below 20%.";
pub const HELP_REPLY: &str = "I can find charging stations, compare prices, start a session, handle the crypto payment and monitor your charge. Just ask!";
pub const PRICE_REPLY: &str = "Prices range from 19.5 to 23.5 INR per kWh, or 0.24 to 0.29 USDC per kWh when paying in crypto.";

/// Keyword table, checked in order; the first keyword found in the input wins.
const CANNED_REPLIES: &[(&[&str], &str)] = &[
    (&["wallet", "balance"], WALLET_REPLY),
    (&["station"], STATION_REPLY),
    (&["payment", "pay "], PAYMENT_REPLY),
    (&["charge"], CHARGE_REPLY),
    (&["battery"], BATTERY_REPLY),
    (&["help"], HELP_REPLY),
    (&["price", "cost"], PRICE_REPLY),
];

pub const FALLBACK_REPLY: &str = "I'm not sure about that yet. Ask me about stations, prices, payments or your charging session.";

/// Canned answer for `input`, or `None` when the question needs the remote agent.
pub fn local_reply(input: &str) -> Option<&'static str> {
    let normalized = input.to_lowercase();

    CANNED_REPLIES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|keyword| normalized.contains(keyword)))
        .map(|(_, reply)| *reply)
}

#[cfg(test)]
mod tests {
    use super::{
        BATTERY_REPLY, CHARGE_REPLY, HELP_REPLY, PRICE_REPLY, STATION_REPLY, WALLET_REPLY,
        local_reply,
    };

    #[test]
    fn wallet_question_gets_balance_reply() {
        assert_eq!(local_reply("What's in my Wallet?"), Some(WALLET_REPLY));
        assert!(WALLET_REPLY.contains("USDC"));
    }

    #[test]
    fn wallet_wins_over_later_keywords() {
        assert_eq!(
            local_reply("can my wallet pay for this station"),
            Some(WALLET_REPLY)
        );
    }

    #[test]
    fn matches_each_keyword() {
        assert_eq!(local_reply("nearest station?"), Some(STATION_REPLY));
        assert_eq!(local_reply("how do I charge"), Some(CHARGE_REPLY));
        assert_eq!(local_reply("battery is low"), Some(BATTERY_REPLY));
        assert_eq!(local_reply("HELP"), Some(HELP_REPLY));
        assert_eq!(local_reply("what's the price"), Some(PRICE_REPLY));
    }

    #[test]
    fn charging_matches_charge_keyword() {
        assert_eq!(local_reply("is charging slow today"), Some(CHARGE_REPLY));
    }

    #[test]
    fn unknown_input_falls_through() {
        assert_eq!(local_reply("tell me a joke"), None);
        assert_eq!(local_reply(""), None);
    }
}
