//! Proforma and product writes racing bill creation on a shared file
//! database. Every writer must wait its turn for the lock; none may fail
//! with "database is locked".

use chrono::NaiveDate;
use tally_db::{
    Database, DbConfig, DbError, LineRequest, NewInvoice, NewProduct, NewProforma, ProductUpdate,
    ProformaLineRequest,
};

const INITIAL_STOCK: i64 = 1_000_000;

async fn file_db(dir: &tempfile::TempDir) -> Database {
    let config = DbConfig::new(dir.path().join("tally.db")).max_connections(10);
    Database::new(config).await.unwrap()
}

async fn add_product(db: &Database, name: &str) -> String {
    db.products()
        .create(NewProduct {
            name: name.to_string(),
            imei: None,
            selling_price_cents: 10_000,
            purchase_price_cents: 8_000,
            tax_rate_bps: 1800,
            category: Some("Mobiles".to_string()),
            stock: INITIAL_STOCK,
            agency_name: String::new(),
        })
        .await
        .unwrap()
        .id
}

fn bill(product_id: &str) -> NewInvoice {
    NewInvoice {
        customer_name: "Asha".to_string(),
        customer_phone: String::new(),
        created_by: None,
        items: vec![LineRequest {
            product_id: product_id.to_string(),
            quantity: 1,
        }],
    }
}

fn quotation(product_id: &str) -> NewProforma {
    NewProforma {
        customer_name: "Meridian Traders".to_string(),
        customer_phone: String::new(),
        billing_address: String::new(),
        delivery_address: String::new(),
        issue_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
        valid_until: None,
        currency: "INR".to_string(),
        discount_amount_cents: 0,
        shipping_charge_cents: 0,
        insurance_charge_cents: 0,
        incoterms: String::new(),
        country_of_origin: String::new(),
        port_of_loading: String::new(),
        payment_terms: String::new(),
        bank_name: String::new(),
        account_number: String::new(),
        ifsc_swift: String::new(),
        related_invoice_no: None,
        created_by: None,
        items: vec![ProformaLineRequest {
            product_id: product_id.to_string(),
            quantity: 2,
            hsn_sac: "8517".to_string(),
        }],
    }
}

/// What each spawned task did, so failures can be reported by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Writer {
    Bill,
    Proforma,
    ProductUpdate,
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn proformas_and_product_updates_wait_for_concurrent_bills() {
    let dir = tempfile::tempdir().unwrap();
    let db = file_db(&dir).await;
    let id = add_product(&db, "Phone X").await;

    let mut handles = Vec::new();
    for n in 0..150 {
        let db = db.clone();
        let id = id.clone();
        let writer = match n % 3 {
            0 => Writer::Bill,
            1 => Writer::Proforma,
            _ => Writer::ProductUpdate,
        };
        handles.push(tokio::spawn(async move {
            let result: Result<(), DbError> = match writer {
                Writer::Bill => db.invoices().create(&bill(&id)).await.map(|_| ()),
                Writer::Proforma => db.proformas().create(&quotation(&id)).await.map(|_| ()),
                Writer::ProductUpdate => db
                    .products()
                    .update(
                        &id,
                        ProductUpdate {
                            agency_name: Some(format!("Distributor {n}")),
                            ..Default::default()
                        },
                    )
                    .await
                    .map(|_| ()),
            };
            (writer, result)
        }));
    }

    let mut failures = Vec::new();
    for handle in handles {
        let (writer, result) = handle.await.unwrap();
        if let Err(err) = result {
            failures.push((writer, err));
        }
    }
    assert!(failures.is_empty(), "failed writers: {failures:?}");

    assert_eq!(db.invoices().count().await.unwrap(), 50);
    assert_eq!(db.proformas().list().await.unwrap().len(), 50);
    // Only bills move stock.
    let product = db.products().get_by_id(&id).await.unwrap().unwrap();
    assert_eq!(product.stock, INITIAL_STOCK - 50);
    assert!(product.agency_name.starts_with("Distributor "));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn proforma_links_and_deletes_wait_for_concurrent_bills() {
    let dir = tempfile::tempdir().unwrap();
    let db = file_db(&dir).await;
    let id = add_product(&db, "Phone X").await;

    let seed = db.invoices().create(&bill(&id)).await.unwrap();
    let invoice_no = seed.invoice.invoice_no.clone();

    let mut proforma_ids = Vec::new();
    for _ in 0..20 {
        let details = db.proformas().create(&quotation(&id)).await.unwrap();
        proforma_ids.push(details.proforma.id);
    }

    let mut spare_ids = Vec::new();
    for n in 0..20 {
        spare_ids.push(add_product(&db, &format!("Spare {n}")).await);
    }

    let mut handles = Vec::new();
    for proforma_id in proforma_ids {
        let db = db.clone();
        let invoice_no = invoice_no.clone();
        handles.push(tokio::spawn(async move {
            db.proformas().link_invoice(&proforma_id, &invoice_no).await.map(|_| ())
        }));
    }
    for spare_id in spare_ids {
        let db = db.clone();
        handles.push(tokio::spawn(async move { db.products().delete(&spare_id).await }));
    }
    for _ in 0..40 {
        let db = db.clone();
        let id = id.clone();
        handles.push(tokio::spawn(async move {
            db.invoices().create(&bill(&id)).await.map(|_| ())
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let proformas = db.proformas().list().await.unwrap();
    assert_eq!(proformas.len(), 20);
    for proforma in &proformas {
        let related = proforma.related_invoice.as_ref().unwrap();
        assert_eq!(related.invoice_no, invoice_no);
    }
    assert_eq!(db.products().count().await.unwrap(), 1);
    assert_eq!(db.invoices().count().await.unwrap(), 41);
}
