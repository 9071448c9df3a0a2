use track_search::lazy_image::{
    Bounds, ImageElement, IntersectionEntry, LazyImageLoader, RegistrationError, Viewport,
};

const COVER: &str = "http://127.0.0.1:3030/static/cover-1.jpg";

#[test]
fn test_fires_once_on_intersection() {
    let loader = LazyImageLoader::new();
    let element = ImageElement::mounted_at(Bounds::row(40));
    loader.register(&element, COVER).unwrap();

    // Off screen: nothing happens
    assert!(loader.observe_viewport(&Viewport::new(0, 20)).is_empty());
    assert_eq!(element.src(), None);
    assert_eq!(element.data_src().as_deref(), Some(COVER));

    // Scrolled into view
    let fired = loader.observe_viewport(&Viewport::new(30, 20));
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].id(), element.id());
    assert_eq!(element.src().as_deref(), Some(COVER));
    assert!(!loader.is_observing(&element));

    // Away and back again
    assert!(loader.observe_viewport(&Viewport::new(0, 20)).is_empty());
    assert!(loader.observe_viewport(&Viewport::new(30, 20)).is_empty());
    assert_eq!(element.load_count(), 1);
    assert_eq!(loader.fired_total(), 1);
}

#[test]
fn test_repeated_entries_fire_once() {
    let loader = LazyImageLoader::new();
    let element = ImageElement::mounted_at(Bounds::row(0));
    loader.register(&element, COVER).unwrap();

    let entry = IntersectionEntry {
        element: element.id(),
        ratio: 0.5,
    };
    let fired = loader.handle_entries(&[entry, entry]);
    assert_eq!(fired.len(), 1);
    assert!(loader.handle_entries(&[entry]).is_empty());
    assert_eq!(element.load_count(), 1);
}

#[test]
fn test_only_visible_rows_load() {
    let loader = LazyImageLoader::new();
    let rows: Vec<ImageElement> = (0..200)
        .map(|i| ImageElement::mounted_at(Bounds::row(i)))
        .collect();
    for (i, row) in rows.iter().enumerate() {
        loader.register(row, format!("http://img/{}", i)).unwrap();
    }

    let fired = loader.observe_viewport(&Viewport::new(0, 15));
    assert_eq!(fired.len(), 15);
    assert_eq!(loader.observed_count(), 185);
    assert!(rows[14].is_loaded());
    assert!(!rows[15].is_loaded());
}

#[test]
fn test_partial_intersection_counts() {
    let loader = LazyImageLoader::new();
    let tall = ImageElement::mounted_at(Bounds::new(18, 4));
    loader.register(&tall, COVER).unwrap();

    // Two of four rows visible
    let fired = loader.observe_viewport(&Viewport::new(0, 20));
    assert_eq!(fired.len(), 1);
}

#[test]
fn test_rejects_empty_url() {
    let loader = LazyImageLoader::new();
    let element = ImageElement::mounted_at(Bounds::row(0));

    assert_eq!(
        loader.register(&element, ""),
        Err(RegistrationError::EmptyUrl {
            element: element.id()
        })
    );
    assert!(matches!(
        loader.register(&element, "   "),
        Err(RegistrationError::EmptyUrl { .. })
    ));
    assert_eq!(loader.observed_count(), 0);
}

#[test]
fn test_rejects_unmounted_element() {
    let loader = LazyImageLoader::new();
    let element = ImageElement::new();

    let err = loader.register(&element, COVER).unwrap_err();
    assert_eq!(
        err,
        RegistrationError::NotMounted {
            element: element.id()
        }
    );
    assert!(err.to_string().contains("not mounted"));
}

#[test]
fn test_rejects_already_loaded_element() {
    let loader = LazyImageLoader::new();
    let element = ImageElement::mounted_at(Bounds::row(0));
    loader.register(&element, COVER).unwrap();
    loader.observe_viewport(&Viewport::new(0, 10));

    assert!(matches!(
        loader.register(&element, COVER),
        Err(RegistrationError::AlreadyFired { .. })
    ));
}

#[test]
fn test_dropped_element_is_abandoned() {
    let loader = LazyImageLoader::new();
    let element = ImageElement::mounted_at(Bounds::row(3));
    let id = element.id();
    loader.register(&element, COVER).unwrap();
    drop(element);

    let fired = loader.handle_entries(&[IntersectionEntry {
        element: id,
        ratio: 1.0,
    }]);
    assert!(fired.is_empty());
    assert_eq!(loader.observed_count(), 0);
    assert_eq!(loader.fired_total(), 0);
}

#[test]
fn test_unknown_entries_are_ignored() {
    let loader = LazyImageLoader::new();
    let stranger = ImageElement::mounted_at(Bounds::row(0));

    let fired = loader.handle_entries(&[IntersectionEntry {
        element: stranger.id(),
        ratio: 1.0,
    }]);
    assert!(fired.is_empty());
    assert_eq!(stranger.src(), None);
}

#[test]
fn test_moved_element_is_observed_at_new_position() {
    let loader = LazyImageLoader::new();
    let element = ImageElement::mounted_at(Bounds::row(5));
    loader.register(&element, COVER).unwrap();

    element.set_bounds(Bounds::row(50));
    assert!(loader.observe_viewport(&Viewport::new(0, 20)).is_empty());
    assert_eq!(loader.observe_viewport(&Viewport::new(45, 20)).len(), 1);
}

#[test]
fn test_shutdown_abandons_and_rejects() {
    let loader = LazyImageLoader::new();
    let pending = ImageElement::mounted_at(Bounds::row(100));
    loader.register(&pending, COVER).unwrap();

    let shared = loader.clone();
    shared.shutdown();
    assert!(loader.is_shut_down());
    assert_eq!(loader.observed_count(), 0);
    assert!(loader.observe_viewport(&Viewport::new(90, 20)).is_empty());
    assert_eq!(pending.src(), None);

    let late = ImageElement::mounted_at(Bounds::row(0));
    assert!(matches!(
        loader.register(&late, COVER),
        Err(RegistrationError::LoaderShutDown { .. })
    ));
}
