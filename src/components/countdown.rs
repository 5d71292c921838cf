use gloo_timers::callback::Interval;
use yew::prelude::*;

use crate::utils::{countdown_parts, now_unix};

/// Ticks down to `go_live` once a second and fires `on_complete` at zero.
pub struct Countdown {
    remaining: i64,
    _interval: Interval,
}

pub enum Msg {
    Tick,
}

#[derive(Properties, PartialEq)]
pub struct Props {
    pub go_live: i64,
    pub on_complete: Callback<()>,
}

impl Component for Countdown {
    type Message = Msg;
    type Properties = Props;

    fn create(ctx: &Context<Self>) -> Self {
        let link = ctx.link().clone();
        Self {
            remaining: ctx.props().go_live - now_unix(),
            _interval: Interval::new(1_000, move || link.send_message(Msg::Tick)),
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::Tick => {
                self.remaining = ctx.props().go_live - now_unix();
                if self.remaining <= 0 {
                    ctx.props().on_complete.emit(());
                }
                true
            }
        }
    }

    fn changed(&mut self, ctx: &Context<Self>, _old_props: &Self::Properties) -> bool {
        self.remaining = ctx.props().go_live - now_unix();
        true
    }

    fn view(&self, _ctx: &Context<Self>) -> Html {
        let (days, hours, minutes, seconds) = countdown_parts(self.remaining);
        html! {
            <p class="timer-container">
                <span class="timer-header">{"Candy Drop Starting In"}</span>
                <span class="timer-value">
                    {format!("{}d {}h {}m {}s", days, hours, minutes, seconds)}
                </span>
            </p>
        }
    }
}
