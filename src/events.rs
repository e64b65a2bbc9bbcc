// ==============================================================================
// events.rs - TYPED EVENT CHANNELS (SYNCHRONOUS PUB/SUB)
// ------------------------------------------------------------------------------
// An EventChannel<T> owns a list of listeners. raise() calls them in place,
// newest subscriber first, before returning. A listener may ask to be dropped
// by returning Listener::Remove; removal happens during the same dispatch and
// never disturbs the listeners still to be called.
//
// The vehicle uses three channels (VehicleSignals): looping-sound start/stop
// requests and a per-tick engine pitch value. forward_sound_cues() turns the
// sound channels into a stream of SoundCue values for the network layer.
// ==============================================================================

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// What a listener wants after handling one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listener {
    Keep,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback<T> = Box<dyn FnMut(&T) -> Listener + Send>;

pub struct EventChannel<T> {
    listeners: Vec<(ListenerId, Callback<T>)>,
    next_id: u64,
}

impl<T> Default for EventChannel<T> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }
}

impl<T> std::fmt::Debug for EventChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<T> EventChannel<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&T) -> Listener + Send + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        match self.listeners.iter().position(|(lid, _)| *lid == id) {
            Some(index) => {
                self.listeners.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn raise(&mut self, value: &T) {
        // Back to front so removing index i leaves 0..i untouched.
        for i in (0..self.listeners.len()).rev() {
            if (self.listeners[i].1)(value) == Listener::Remove {
                self.listeners.remove(i);
            }
        }
    }
}

/// Looping sounds a vehicle can ask the audio side to start or stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopingSound {
    CarEngine,
    CarDrift,
}

/// Outgoing signals of one vehicle.
#[derive(Debug, Default)]
pub struct VehicleSignals {
    pub start_looping_sound: EventChannel<LoopingSound>,
    pub stop_looping_sound: EventChannel<LoopingSound>,
    /// Signed motor revolution rate, raised every tick.
    pub engine_pitch: EventChannel<f32>,
}

/// A start/stop request as sent to clients: `{"start":"car_drift"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundCue {
    Start(LoopingSound),
    Stop(LoopingSound),
}

impl VehicleSignals {
    /// Push every looping-sound request into `tx`. The listeners drop
    /// themselves once the receiving side is gone.
    pub fn forward_sound_cues(&mut self, tx: UnboundedSender<SoundCue>) {
        let start_tx = tx.clone();
        self.start_looping_sound.subscribe(move |sound| {
            match start_tx.send(SoundCue::Start(*sound)) {
                Ok(()) => Listener::Keep,
                Err(_) => Listener::Remove,
            }
        });
        self.stop_looping_sound.subscribe(move |sound| {
            match tx.send(SoundCue::Stop(*sound)) {
                Ok(()) => Listener::Keep,
                Err(_) => Listener::Remove,
            }
        });
    }
}
