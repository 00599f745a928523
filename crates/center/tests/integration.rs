pub mod fixtures;

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use herald_center::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn drain_notices(center: &NotificationCenter) {
        center.process_events();
    }

    #[test]
    fn test_duplicate_registration_is_a_no_op() {
        let center = NotificationCenter::new();
        let before = center.registered_event_count();

        assert!(center.register_event("x.y"));
        assert!(!center.register_event("x.y"));
        assert!(!center.register_event("  x.y  "));

        assert_eq!(center.registered_event_count(), before + 1);
        assert!(center.registered_events().contains("x.y"));
    }

    #[test]
    fn test_blank_names_are_refused() {
        let center = NotificationCenter::new();
        let before = center.registered_event_count();
        assert!(!center.register_event(""));
        assert!(!center.register_event("   "));
        assert_eq!(center.registered_event_count(), before);
    }

    #[test]
    fn test_deferred_connection_activates_on_registration() {
        let center = NotificationCenter::new();
        let recorder = Recorder::new();
        let evt = id("x.y");

        let handle = center.connect_fn(&evt, recorder.tagged("native")).expect("connect");
        assert!(center.is_valid(handle));
        assert!(center.is_deferred(handle));
        assert!(!center.is_active(handle));
        assert_eq!(center.deferred_event_count(), 1);

        center.post_with(&evt, Priority::Normal, PostMode::Now);
        assert!(recorder.entries().is_empty(), "deferred sinks never receive events");

        assert!(center.register_event("x.y"));
        assert!(!center.is_deferred(handle));
        assert!(center.is_active(handle));
        assert_eq!(center.deferred_event_count(), 0);

        center.post_with(&evt, Priority::Normal, PostMode::Now);
        assert_eq!(recorder.entries(), vec!["native"]);
    }

    #[test]
    fn test_disconnect_is_idempotent_and_isolated() {
        let center = NotificationCenter::new();
        let recorder = Recorder::new();
        let evt = id("evt.a");
        center.register(&evt);

        let first = center.connect_fn(&evt, recorder.tagged("first")).expect("connect");
        let second = center.connect_fn(&evt, recorder.tagged("second")).expect("connect");

        assert!(center.disconnect(first));
        assert!(!center.disconnect(first));
        assert!(!center.disconnect(ConnectionId::new(9_999)));

        assert!(!center.is_valid(first));
        assert!(center.is_active(second));

        center.post_with(&evt, Priority::Normal, PostMode::Now);
        assert_eq!(recorder.entries(), vec!["second"]);
    }

    #[test]
    fn test_disconnect_of_deferred_connection_removes_waiter() {
        let center = NotificationCenter::new();
        let evt = id("evt.later");
        let mut handles = vec![
            center.connect_fn(&evt, |_| {}).expect("connect"),
            center.connect_fn(&evt, |_| {}).expect("connect"),
        ];
        assert_eq!(center.deferred_event_count(), 1);

        center.disconnect_all(&mut handles);
        assert!(handles.is_empty());
        assert_eq!(center.deferred_event_count(), 0);
        assert_eq!(center.connection_count(), 0);
    }

    #[test]
    fn test_now_post_delivers_before_returning() {
        let center = NotificationCenter::new();
        let evt = id("evt.a");
        center.register(&evt);

        let flag = Rc::new(Cell::new(false));
        let sink_flag = Rc::clone(&flag);
        center.connect_fn(&evt, move |_| sink_flag.set(true)).expect("connect");

        center.post_with(&evt, Priority::Normal, PostMode::Now);
        assert!(flag.get());
    }

    #[test]
    fn test_queued_posts_deliver_by_priority() {
        let center = NotificationCenter::new();
        let recorder = Recorder::new();
        let evt = id("evt.priority");
        center.register(&evt);
        center.connect_fn(&evt, recorder.orders()).expect("connect");
        drain_notices(&center);

        center.post_with(Event::new(evt.clone()).with("order", 1), Priority::Low, PostMode::Soon);
        center.post_with(Event::new(evt.clone()).with("order", 2), Priority::High, PostMode::Soon);
        center.post_with(Event::new(evt.clone()).with("order", 3), Priority::Normal, PostMode::Soon);
        center.post_with(Event::new(evt.clone()).with("order", 4), Priority::High, PostMode::Soon);
        assert!(recorder.entries().is_empty());

        assert_eq!(center.process_events(), 4);
        assert_eq!(recorder.entries(), vec!["2", "4", "3", "1"]);
    }

    #[test]
    fn test_now_post_drains_queue_first() {
        let center = NotificationCenter::new();
        let recorder = Recorder::new();
        let evt = id("evt.drain");
        center.register(&evt);
        center.connect_fn(&evt, recorder.orders()).expect("connect");

        center.post(Event::new(evt.clone()).with("order", "A"));
        center.post_with(Event::new(evt.clone()).with("order", "B"), Priority::High, PostMode::Now);

        assert_eq!(recorder.entries(), vec!["\"A\"", "\"B\""]);
        assert_eq!(center.pending_events(), 0);
    }

    #[test]
    fn test_posts_made_during_a_drain_wait_for_the_next_drain() {
        let center = Rc::new(NotificationCenter::new());
        let recorder = Recorder::new();
        let first = id("evt.first");
        let second = id("evt.second");
        center.register(&first);
        center.register(&second);
        drain_notices(&center);

        let weak = Rc::downgrade(&center);
        let chained = second.clone();
        center
            .connect_fn(&first, move |_| {
                if let Some(center) = weak.upgrade() {
                    center.post(&chained);
                }
            })
            .expect("connect");
        center.connect_fn(&second, recorder.tagged("second")).expect("connect");
        drain_notices(&center);

        center.post(&first);
        assert_eq!(center.process_events(), 1);
        assert!(recorder.entries().is_empty());
        assert_eq!(center.process_events(), 1);
        assert_eq!(recorder.entries(), vec!["second"]);
    }

    #[test]
    fn test_native_and_foreign_each_invoked_once_native_first() {
        let center = NotificationCenter::new();
        let recorder = Recorder::new();
        let runtime = Rc::new(FakeRuntime { recorder: recorder.clone(), ..FakeRuntime::default() });
        let evt = id("evt.mixed");
        center.register(&evt);

        center
            .connect(&evt, Sink::foreign(Rc::clone(&runtime), FakeObject::Method("handler".into())))
            .expect("foreign connect");
        center.connect_fn(&evt, recorder.tagged("native")).expect("native connect");

        center.post_with(&evt, Priority::Normal, PostMode::Now);

        assert_eq!(recorder.entries(), vec!["native", "foreign:handler"]);
        assert_eq!(runtime.acquisitions.get(), 1);
        assert!(!runtime.locked.get(), "lock released after invocation");
    }

    #[test]
    fn test_sink_kinds_run_native_toolkit_foreign() {
        let center = NotificationCenter::new();
        let recorder = Recorder::new();
        let runtime = Rc::new(FakeRuntime { recorder: recorder.clone(), ..FakeRuntime::default() });
        let panel: Rc<dyn SlotTarget> = Rc::new(Panel { recorder: recorder.clone() });
        let evt = id("evt.kinds");

        center.connect(&evt, Sink::foreign(Rc::clone(&runtime), FakeObject::Method("f".into()))).expect("foreign");
        center.connect_slot(&evt, Rc::clone(&panel), "onEvent(Event)").expect("slot with event");
        center.connect_slot(&evt, panel, "refresh()").expect("slot without args");
        center.connect_fn(&evt, recorder.tagged("native")).expect("native");
        center.register(&evt);

        center.post_with(&evt, Priority::Normal, PostMode::Now);
        assert_eq!(
            recorder.entries(),
            vec!["native", "toolkit:onEvent:evt.kinds", "toolkit:refresh", "foreign:f"]
        );
    }

    #[test]
    fn test_rejected_slot_creates_no_connection() {
        let center = NotificationCenter::new();
        let panel: Rc<dyn SlotTarget> = Rc::new(Panel { recorder: Recorder::new() });
        let evt = id("evt.slots");
        center.register(&evt);

        let before = center.connect_fn(&evt, |_| {}).expect("connect");
        for slot in ["resize(int,int)", "missing(Event)", "broken("] {
            let err = center.connect_slot(&evt, Rc::clone(&panel), slot).expect_err(slot);
            assert!(matches!(err, CenterError::SinkAttachRejected { .. }));
        }
        let after = center.connect_fn(&evt, |_| {}).expect("connect");

        assert_eq!(after.get(), before.get() + 1, "rejected connects consume no handle");
        assert_eq!(center.connection_count(), 2);
    }

    #[test]
    fn test_rejected_slot_on_unregistered_identity_is_not_deferred() {
        let center = NotificationCenter::new();
        let panel: Rc<dyn SlotTarget> = Rc::new(Panel { recorder: Recorder::new() });

        assert!(center.connect_slot(&id("evt.future"), panel, "resize(int,int)").is_err());
        assert_eq!(center.deferred_event_count(), 0);
    }

    #[test]
    fn test_non_callable_foreign_object_is_rejected() {
        let center = NotificationCenter::new();
        let runtime = Rc::new(FakeRuntime::default());

        let err = center
            .connect(&id("evt.foreign"), Sink::foreign(Rc::clone(&runtime), FakeObject::Plain))
            .expect_err("plain objects are not callable");
        assert!(matches!(err, CenterError::SinkAttachRejected { .. }));
        assert_eq!(center.connection_count(), 0);
        assert_eq!(runtime.acquisitions.get(), 0);
    }

    #[test]
    fn test_sink_failures_do_not_stop_delivery() {
        let center = NotificationCenter::new();
        let recorder = Recorder::new();
        let runtime = Rc::new(FakeRuntime { recorder: recorder.clone(), ..FakeRuntime::default() });
        let panel: Rc<dyn SlotTarget> = Rc::new(Panel { recorder: recorder.clone() });
        let evt = id("evt.failures");
        center.register(&evt);

        center
            .connect(&evt, Sink::native_fallible(|_| Err(SinkError::callback("refused"))))
            .expect("connect");
        center.connect_fn(&evt, |_| panic!("native sink panicked")).expect("connect");
        center.connect_fn(&evt, recorder.tagged("native")).expect("connect");
        center.connect_slot(&evt, panel, "fail(Event)").expect("connect");
        center.connect(&evt, Sink::foreign(Rc::clone(&runtime), FakeObject::Raiser)).expect("connect");
        center
            .connect(&evt, Sink::foreign(Rc::clone(&runtime), FakeObject::Method("after".into())))
            .expect("connect");

        center.post_with(&evt, Priority::Normal, PostMode::Now);

        assert_eq!(recorder.entries(), vec!["native", "foreign:after"]);
        assert_eq!(runtime.acquisitions.get(), 2);
        assert!(!runtime.pending_error.get(), "foreign error cleared locally");
        assert_eq!(runtime.clears.get(), 1);
        assert!(!runtime.locked.get());
    }

    #[test]
    fn test_unconvertible_fields_pass_empty_mapping() {
        let center = NotificationCenter::new();
        let runtime = Rc::new(FakeRuntime::default());
        runtime.fail_conversion.set(true);
        let evt = id("evt.convert");
        center.register(&evt);
        center.connect(&evt, Sink::foreign(Rc::clone(&runtime), FakeObject::Method("m".into()))).expect("connect");

        center.post_with(Event::new(evt).with("k", "v"), Priority::Normal, PostMode::Now);

        assert_eq!(*runtime.argument_sizes.borrow(), vec![0]);
        assert!(!runtime.pending_error.get());
    }

    #[test]
    fn test_well_known_notifications_carry_id_and_type() {
        let center = NotificationCenter::new();
        let notices = Recorder::new();
        let well_known = center.well_known().clone();

        for notice in [&well_known.registered, &well_known.connected, &well_known.disconnected] {
            let notices = notices.clone();
            let label = notice.name().rsplit('.').next().unwrap_or_default().to_owned();
            center
                .connect_fn(notice, move |event| {
                    let kind = event.get_str(KEY_TYPE).unwrap_or("-");
                    notices.push(format!("{label} {} {kind}", event.get_str(KEY_ID).unwrap_or("?")));
                })
                .expect("connect");
        }
        drain_notices(&center);
        let baseline = notices.entries().len();

        let evt = id("evt.observed");
        let deferred = center.connect_fn(&evt, |_| {}).expect("connect");
        center.register(&evt);
        center.disconnect(deferred);
        drain_notices(&center);

        assert_eq!(
            notices.entries()[baseline..],
            [
                "EventConnected evt.observed native".to_owned(),
                "EventRegistered evt.observed -".to_owned(),
                "EventDisconnected evt.observed native".to_owned(),
            ]
        );
    }

    #[test]
    fn test_posts_without_sinks_are_dropped_silently() {
        let center = NotificationCenter::new();
        center.post_with(&id("evt.nobody"), Priority::High, PostMode::Now);
        center.post(&id("evt.nobody"));
        center.process_events();
        assert_eq!(center.pending_events(), 0);
    }

    #[test]
    fn test_dump_lists_connections() {
        let center = NotificationCenter::new();
        let panel: Rc<dyn SlotTarget> = Rc::new(Panel { recorder: Recorder::new() });
        let evt = id("evt.dump");
        center.register(&evt);
        let native = center.connect_fn(&evt, |_| {}).expect("connect");
        center.connect_slot(&evt, panel, "refresh()").expect("connect");
        center.connect_fn(&id("evt.pending"), |_| {}).expect("connect");

        let dump = center.dump_registered_events();
        assert!(dump.contains("Registered event: evt.dump"));
        assert!(dump.contains("signal: evt.dump(Event)"));
        assert!(dump.contains(&format!("          id: {native}")));
        assert!(dump.contains("type: toolkit"));
        assert!(dump.contains(&format!("Registered event: {}\n     no connections", WellKnownEvents::CONNECTED)));
        assert!(dump.contains("Deferred connection: evt.pending (native"));
    }

    #[test]
    fn test_drop_closes_posters_and_discards_queue() {
        let center = NotificationCenter::new();
        let evt = id("evt.shutdown");
        center.register(&evt);
        center.connect_fn(&evt, |_| {}).expect("connect");
        center.connect_fn(&id("evt.never"), |_| {}).expect("connect");
        let poster = center.poster();
        assert!(poster.post(&evt));

        let logs = CapturedLogs::default();
        logs.capture(|| drop(center));

        assert_eq!(logs.lines_with("Forcing disconnect at shutdown"), 2);
        assert_eq!(logs.lines_with("shutting down with live connections"), 1);
        assert_eq!(logs.lines_with("Discarding undelivered events at shutdown"), 1);
        assert!(logs.contents().contains("state=deferred"));

        assert!(poster.is_closed());
        assert!(!poster.post(&evt));
    }

    #[test]
    fn test_now_from_sink_delivers_earlier_queued_first() {
        let center = Rc::new(NotificationCenter::new());
        let recorder = Recorder::new();
        let trigger = id("evt.trigger");
        let log = id("evt.log");
        center.register(&trigger);
        center.register(&log);
        center.connect_fn(&log, recorder.orders()).expect("connect");

        let weak = Rc::downgrade(&center);
        let target = log.clone();
        center
            .connect_fn(&trigger, move |_| {
                if let Some(center) = weak.upgrade() {
                    center.post_with(Event::new(target.clone()).with("order", 2), Priority::Normal, PostMode::Now);
                }
            })
            .expect("connect");
        drain_notices(&center);

        center.post(&trigger);
        center.post(Event::new(log.clone()).with("order", 1));
        center.post(Event::new(log.clone()).with("order", 3));
        center.process_events();

        assert_eq!(recorder.entries(), vec!["1", "3", "2"]);
        assert_eq!(center.pending_events(), 0);
    }

    #[test]
    fn test_dispatch_record_survives_last_disconnect() {
        let center = NotificationCenter::new();
        let recorder = Recorder::new();
        let panel: Rc<dyn SlotTarget> = Rc::new(Panel { recorder: recorder.clone() });
        let evt = id("evt.kept");
        center.register(&evt);

        let mut handles = vec![
            center.connect_slot(&evt, Rc::clone(&panel), "onEvent(Event)").expect("connect"),
            center.connect_fn(&evt, recorder.tagged("native")).expect("connect"),
        ];
        center.disconnect_all(&mut handles);

        center.post_with(&evt, Priority::Normal, PostMode::Now);
        assert!(recorder.entries().is_empty());
        assert!(center.registered_events().contains("evt.kept"));

        let dump = center.dump_registered_events();
        assert!(dump.contains("Registered event: evt.kept\n     signal: evt.kept(Event)\n     no connections"));

        center.connect_slot(&evt, panel, "onEvent(Event)").expect("reconnect");
        center.post_with(&evt, Priority::Normal, PostMode::Now);
        assert_eq!(recorder.entries(), vec!["toolkit:onEvent:evt.kept"]);
    }

    #[test]
    fn test_flag_file_enables_verbose_activity() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let flag = dir.path().join("herald_debug");
        let config = CenterConfig { debug_flag_path: flag.clone(), ..CenterConfig::default() };

        assert!(!NotificationCenter::with_config(&config).is_verbose());
        std::fs::write(&flag, b"")?;
        assert!(NotificationCenter::with_config(&config).is_verbose());
        Ok(())
    }

    #[test]
    fn test_custom_ordinal_allocator() {
        #[derive(Debug)]
        struct Fixed;
        impl OrdinalAllocator for Fixed {
            fn allocate(&self, name: &str) -> Ordinal {
                Ordinal::new(u32::try_from(name.len()).unwrap_or(u32::MAX))
            }
        }

        let center = NotificationCenter::with_allocator(&CenterConfig::default(), Box::new(Fixed));
        let evt = id("evt.abc");
        center.register(&evt);
        assert_eq!(center.resolve(&evt).and_then(|e| e.ordinal()), Some(Ordinal::new(7)));
    }
}
