use geostore::{
    Error, Feature, FeatureId, FeatureLock, FeatureType, Filter, IdentityMapper, LockOwner, Query,
    Store, Type, Value,
};
use pretty_assertions::assert_eq;
use std::time::Duration;
use tests::{tests, GeoTest};

const MINUTE: Duration = Duration::from_secs(60);

async fn parcels(test: &mut GeoTest) -> (Store, String, Vec<FeatureId>) {
    let ty = FeatureType::builder(test.type_name("parcels"))
        .column("owner", Type::String)
        .build()
        .unwrap();

    let store = test.setup_store_with(&ty).await;
    let ids = store
        .insert(
            &ty.name,
            vec![
                Feature::new().value("owner", "ann"),
                Feature::new().value("owner", "bob"),
            ],
        )
        .await
        .unwrap();

    (store, ty.name, ids)
}

fn set_owner(owner: &str) -> Vec<(String, Value)> {
    vec![("owner".to_string(), Value::from(owner))]
}

async fn token_locks_guard_writes(test: &mut GeoTest) {
    let (store, name, ids) = parcels(test).await;
    let ann = ids[0].clone();

    let lock = FeatureLock::with_token("t1", MINUTE);
    let result = store
        .lock(&name, Filter::ids([ann.clone()]), &lock)
        .await
        .unwrap();
    assert!(result.is_complete());
    assert_eq!(result.succeeded, 1);
    assert!(store.locks().is_locked(&ann));

    // A second holder only gets the free feature
    let result = store
        .lock(&name, Filter::Include, &FeatureLock::with_token("t2", MINUTE))
        .await
        .unwrap();
    assert_eq!(result.attempted, 2);
    assert_eq!(result.succeeded, 1);
    assert_eq!(result.failures, vec![ann.clone()]);

    let err = store
        .update(&name, Filter::ids([ann.clone()]), set_owner("eve"))
        .await
        .unwrap_err();
    assert!(err.any(Error::is_write_conflict), "{err}");

    let err = store
        .delete(&name, Filter::eq("owner", "ann"))
        .await
        .unwrap_err();
    assert!(err.any(Error::is_write_conflict), "{err}");
    assert_eq!(store.count(Query::new(&name)).await.unwrap(), 2);

    let err = store
        .unlock(&name, Filter::ids([ann.clone()]), &LockOwner::Token("t2".into()))
        .await
        .unwrap_err();
    assert!(err.any(Error::is_authorization), "{err}");
    assert!(store.locks().is_locked(&ann));

    // The token holder writes through a transaction
    let mut tx = store.begin().await.unwrap();
    tx.add_authorization("t1");
    let count = tx
        .update(&name, Filter::ids([ann.clone()]), set_owner("eve"))
        .await
        .unwrap();
    assert_eq!(count, 1);
    tx.commit().await.unwrap();

    assert_eq!(store.refresh_lock("t1").unwrap(), 1);
    assert_eq!(store.release_lock("t1"), 1);
    assert!(!store.locks().is_locked(&ann));

    let err = store.refresh_lock("t1").unwrap_err();
    assert!(err.is_authorization(), "{err}");

    let count = store
        .update(&name, Filter::ids([ann]), set_owner("ann"))
        .await
        .unwrap();
    assert_eq!(count, 1);

    let result = store
        .unlock(&name, Filter::Include, &LockOwner::Token("t2".into()))
        .await
        .unwrap();
    assert_eq!(result.succeeded, 1);
}

async fn transaction_locks_end_with_the_transaction(test: &mut GeoTest) {
    let (store, name, ids) = parcels(test).await;

    let err = store
        .lock(&name, Filter::Include, &FeatureLock::Transaction)
        .await
        .unwrap_err();
    assert!(err.any(Error::is_validation), "{err}");

    let tx = store.begin().await.unwrap();
    let result = tx
        .lock(&name, Filter::Include, &FeatureLock::Transaction)
        .await
        .unwrap();
    assert_eq!(result.succeeded, 2);
    assert!(ids.iter().all(|id| store.locks().is_locked(id)));

    // The holder itself may write
    let count = tx.delete(&name, Filter::ids([ids[1].clone()])).await.unwrap();
    assert_eq!(count, 1);
    tx.commit().await.unwrap();

    assert!(ids.iter().all(|id| !store.locks().is_locked(id)));
    assert_eq!(store.count(Query::new(&name)).await.unwrap(), 1);
}

async fn expired_locks_do_not_block(test: &mut GeoTest) {
    let (store, name, ids) = parcels(test).await;

    store
        .lock(
            &name,
            Filter::ids([ids[0].clone()]),
            &FeatureLock::with_token("brief", Duration::from_millis(10)),
        )
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!store.locks().is_locked(&ids[0]));

    let count = store
        .update(&name, Filter::ids([ids[0].clone()]), set_owner("eve"))
        .await
        .unwrap();
    assert_eq!(count, 1);
}

async fn keyless_types_cannot_be_locked(test: &mut GeoTest) {
    let ty = FeatureType::builder(test.type_name("readings"))
        .column("value", Type::F64)
        .identity(IdentityMapper::volatile())
        .build()
        .unwrap();

    let store = test.setup_store_with(&ty).await;
    store
        .insert(&ty.name, vec![Feature::new().value("value", 1.5)])
        .await
        .unwrap();

    let err = store
        .lock(&ty.name, Filter::Include, &FeatureLock::token(MINUTE))
        .await
        .unwrap_err();
    assert!(err.any(Error::is_validation), "{err}");
}

tests!(
    token_locks_guard_writes,
    transaction_locks_end_with_the_transaction,
    expired_locks_do_not_block,
    keyless_types_cannot_be_locked,
);
