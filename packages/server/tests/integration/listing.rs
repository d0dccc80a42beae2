use serde_json::json;

use crate::common::{TestApp, image_part, listing_form, routes};

fn refs(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

mod create {
    use super::*;

    #[tokio::test]
    async fn listing_is_created_with_uploaded_images() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let form = listing_form(&[
            ("name", "Warung Sate Pak Budi"),
            ("category", "Kuliner"),
            ("description", "Sate kambing muda"),
            ("phone", "0812 3456 7890"),
        ])
        .part("main_image", image_part("utama.png"))
        .part("additional_images", image_part("satu.png"))
        .part("additional_images", image_part("dua.png"));

        let res = app
            .post_form_with_token(routes::ADMIN_LISTINGS, form, &token)
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["slug"], "warung-sate-pak-budi");
        assert_eq!(res.body["status"], "Active");
        assert_eq!(res.body["phone"], "081234567890");
        assert_eq!(res.body["formatted_phone"], "0812-3456-7890");

        let main = res.body["main_image"].as_str().unwrap().to_string();
        assert!(main.starts_with("/media/main/"), "{main}");
        assert!(app.media_exists(&main));

        let additional = refs(&res.body["additional_images"]);
        assert_eq!(additional.len(), 2);
        assert!(additional.iter().all(|r| app.media_exists(r)));
        assert_eq!(refs(&res.body["all_images"])[0], main);
    }

    #[tokio::test]
    async fn uploaded_images_are_served_under_media() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let listing = app.create_listing(&token, "Kopi Tubruk", "Kuliner").await;
        let main = listing["main_image"].as_str().unwrap();

        let res = app
            .client
            .get(format!("http://{}{}", app.addr, main))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 200);
        assert_eq!(res.headers()["content-type"], "image/png");
        assert!(res.headers().contains_key("etag"));
        assert!(res.bytes().await.unwrap().starts_with(b"\x89PNG"));
    }

    #[tokio::test]
    async fn same_name_gets_a_counter_suffix() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let first = app.create_listing(&token, "Warung Sate", "Kuliner").await;
        let second = app.create_listing(&token, "Warung Sate", "Kuliner").await;

        assert_eq!(first["slug"], "warung-sate");
        assert_eq!(second["slug"], "warung-sate-1");

        let preview = app
            .get_with_token(&routes::slug_preview("Warung%20Sate"), &token)
            .await;
        assert_eq!(preview.status, 200);
        assert_eq!(preview.body["slug"], "warung-sate-2");
    }

    #[tokio::test]
    async fn explicit_slug_is_normalized() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let form = listing_form(&[
            ("name", "Batik Tulis Bu Sri"),
            ("slug", "Batik Sri!"),
            ("category", "Kerajinan"),
            ("description", "Batik tulis tangan"),
        ])
        .part("main_image", image_part("batik.png"));

        let res = app
            .post_form_with_token(routes::ADMIN_LISTINGS, form, &token)
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["slug"], "batik-sri");
    }

    #[tokio::test]
    async fn missing_main_image_is_rejected_before_any_upload() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let form = listing_form(&[
            ("name", "Tanpa Foto"),
            ("category", "Jasa"),
            ("description", "Belum ada foto"),
        ])
        .part("additional_images", image_part("extra.png"));

        let res = app
            .post_form_with_token(routes::ADMIN_LISTINGS, form, &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert!(!app.media.path().join("additional").exists());

        let list = app.get_with_token(routes::ADMIN_LISTINGS, &token).await;
        assert_eq!(list.body["pagination"]["total"], 0);
    }

    #[tokio::test]
    async fn invalid_fields_are_rejected() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let long_description = "a".repeat(201);

        let cases: [&[(&str, &str)]; 3] = [
            &[("name", "Toko"), ("category", "Jasa"), ("description", "x"), ("phone", "12345")],
            &[("name", "Toko"), ("category", "Jasa"), ("description", long_description.as_str())],
            &[("name", "  "), ("category", "Jasa"), ("description", "x")],
        ];

        for fields in cases {
            let form = listing_form(fields).part("main_image", image_part("a.png"));
            let res = app
                .post_form_with_token(routes::ADMIN_LISTINGS, form, &token)
                .await;
            assert_eq!(res.status, 400, "{fields:?}: {}", res.text);
            assert_eq!(res.body["code"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn unsupported_image_type_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let text_file = reqwest::multipart::Part::bytes(b"hello".to_vec())
            .file_name("notes.txt")
            .mime_str("text/plain")
            .unwrap();
        let form = listing_form(&[
            ("name", "Toko Buku"),
            ("category", "Lainnya"),
            ("description", "Buku bekas"),
        ])
        .part("main_image", text_file);

        let res = app
            .post_form_with_token(routes::ADMIN_LISTINGS, form, &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod directory {
    use super::*;

    #[tokio::test]
    async fn public_directory_only_shows_active_listings() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        app.create_listing(&token, "Kopi Tubruk", "Kuliner").await;
        let hidden = app.create_listing(&token, "Keripik Singkong", "Kuliner").await;
        let hidden_id = hidden["id"].as_i64().unwrap() as i32;

        let toggled = app
            .patch_with_token(&routes::admin_listing_status(hidden_id), &json!({}), &token)
            .await;
        assert_eq!(toggled.status, 200, "{}", toggled.text);
        assert_eq!(toggled.body["status"], "Inactive");

        let public = app.get_without_token(routes::LISTINGS).await;
        assert_eq!(public.status, 200);
        assert_eq!(public.body["pagination"]["total"], 1);
        assert_eq!(public.body["data"][0]["slug"], "kopi-tubruk");

        let detail = app
            .get_without_token(&routes::public_listing("keripik-singkong"))
            .await;
        assert_eq!(detail.status, 404);

        let admin = app
            .get_with_token(&format!("{}?status=Inactive", routes::ADMIN_LISTINGS), &token)
            .await;
        assert_eq!(admin.status, 200);
        assert_eq!(admin.body["pagination"]["total"], 1);
        assert_eq!(admin.body["data"][0]["id"], hidden_id);
    }

    #[tokio::test]
    async fn explicit_status_is_applied() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let listing = app.create_listing(&token, "Madu Hutan", "Pertanian").await;
        let id = listing["id"].as_i64().unwrap() as i32;

        let res = app
            .patch_with_token(
                &routes::admin_listing_status(id),
                &json!({"status": "Pending"}),
                &token,
            )
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["status"], "Pending");

        let res = app
            .patch_with_token(
                &routes::admin_listing_status(id),
                &json!({"status": "Archived"}),
                &token,
            )
            .await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn search_and_category_filters_narrow_results() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        app.create_listing(&token, "Kopi Tubruk", "Kuliner").await;
        app.create_listing(&token, "Batik Tulis", "Kerajinan").await;
        app.create_listing(&token, "Anyaman Bambu", "Kerajinan").await;

        let res = app
            .get_without_token(&format!("{}?search=BATIK", routes::LISTINGS))
            .await;
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["name"], "Batik Tulis");

        let res = app
            .get_without_token(&format!("{}?category=Kerajinan", routes::LISTINGS))
            .await;
        assert_eq!(res.body["pagination"]["total"], 2);

        let res = app
            .get_without_token(&format!("{}?search=50%25_off", routes::LISTINGS))
            .await;
        assert_eq!(res.body["pagination"]["total"], 0);

        let res = app
            .get_without_token(&format!("{}?per_page=2&page=2", routes::LISTINGS))
            .await;
        assert_eq!(res.body["pagination"]["total_pages"], 2);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn categories_and_stats_reflect_listings() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        app.create_listing(&token, "Kopi Tubruk", "Kuliner").await;
        app.create_listing(&token, "Batik Tulis", "Kerajinan").await;
        let hidden = app.create_listing(&token, "Sate Ayam", "Kuliner").await;
        app.patch_with_token(
            &routes::admin_listing_status(hidden["id"].as_i64().unwrap() as i32),
            &json!({"status": "Inactive"}),
            &token,
        )
        .await;

        let res = app.get_without_token(routes::CATEGORIES).await;
        assert_eq!(res.status, 200);
        assert_eq!(refs(&res.body["categories"]), vec!["Kerajinan", "Kuliner"]);
        assert_eq!(res.body["suggestions"].as_array().unwrap().len(), 6);

        let res = app.get_with_token(routes::ADMIN_STATS, &token).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["total"], 3);
        assert_eq!(res.body["active"], 2);
        assert_eq!(res.body["inactive"], 1);
        assert_eq!(res.body["pending"], 0);
        assert_eq!(res.body["by_category"]["Kuliner"], 2);
    }

    #[tokio::test]
    async fn unknown_sort_field_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let res = app
            .get_with_token(&format!("{}?sort_by=slug", routes::ADMIN_LISTINGS), &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod update {
    use super::*;

    async fn listing_with_gallery(app: &TestApp, token: &str) -> serde_json::Value {
        let form = listing_form(&[
            ("name", "Tenun Ikat"),
            ("category", "Kerajinan"),
            ("description", "Kain tenun"),
        ])
        .part("main_image", image_part("utama.png"))
        .part("additional_images", image_part("satu.png"))
        .part("additional_images", image_part("dua.png"));

        let res = app
            .post_form_with_token(routes::ADMIN_LISTINGS, form, token)
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        res.body
    }

    #[tokio::test]
    async fn replacing_and_removing_images_deletes_old_objects() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let listing = listing_with_gallery(&app, &token).await;
        let id = listing["id"].as_i64().unwrap() as i32;
        let old_main = listing["main_image"].as_str().unwrap().to_string();
        let old_additional = refs(&listing["additional_images"]);

        let form = listing_form(&[("remove_images", old_additional[0].as_str())])
            .part("main_image", image_part("baru.png"))
            .part("additional_images", image_part("tiga.png"));

        let res = app
            .put_form_with_token(&routes::admin_listing(id), form, &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let new_main = res.body["main_image"].as_str().unwrap();
        assert_ne!(new_main, old_main);
        assert!(app.media_exists(new_main));
        assert!(!app.media_exists(&old_main));
        assert!(!app.media_exists(&old_additional[0]));

        let additional = refs(&res.body["additional_images"]);
        assert_eq!(additional.len(), 2);
        assert_eq!(additional[0], old_additional[1]);
        assert!(app.media_exists(&additional[1]));
        assert_eq!(res.body["slug"], "tenun-ikat");
    }

    #[tokio::test]
    async fn removing_the_main_image_without_replacement_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let listing = app.create_listing(&token, "Gula Aren", "Pertanian").await;
        let id = listing["id"].as_i64().unwrap() as i32;
        let main = listing["main_image"].as_str().unwrap();

        let form = listing_form(&[("remove_main_image", "true")]);
        let res = app
            .put_form_with_token(&routes::admin_listing(id), form, &token)
            .await;

        assert_eq!(res.status, 400);
        assert!(app.media_exists(main));
        let stored = app.get_with_token(&routes::admin_listing(id), &token).await;
        assert_eq!(stored.body["main_image"], main);
    }

    #[tokio::test]
    async fn unknown_image_reference_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let listing = app.create_listing(&token, "Gula Aren", "Pertanian").await;
        let id = listing["id"].as_i64().unwrap() as i32;

        let form = listing_form(&[("remove_images", "/media/additional/nope.png")]);
        let res = app
            .put_form_with_token(&routes::admin_listing(id), form, &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn renaming_resolves_a_new_slug_but_keeps_its_own() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        app.create_listing(&token, "Warung Sate", "Kuliner").await;
        let listing = app.create_listing(&token, "Warung Bakso", "Kuliner").await;
        let id = listing["id"].as_i64().unwrap() as i32;

        let res = app
            .put_form_with_token(
                &routes::admin_listing(id),
                listing_form(&[("name", "Warung Sate")]),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["slug"], "warung-sate-1");

        let res = app
            .put_form_with_token(
                &routes::admin_listing(id),
                listing_form(&[("description", "Sate dan bakso")]),
                &token,
            )
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["slug"], "warung-sate-1");
        assert_eq!(res.body["description"], "Sate dan bakso");

        let res = app
            .put_form_with_token(
                &routes::admin_listing(id),
                listing_form(&[("phone", ""), ("address", "Jl. Mawar 3")]),
                &token,
            )
            .await;
        assert_eq!(res.status, 200);
        assert!(res.body["phone"].is_null());
        assert_eq!(res.body["address"], "Jl. Mawar 3");
    }

    #[tokio::test]
    async fn missing_listing_returns_not_found() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let res = app
            .put_form_with_token(
                &routes::admin_listing(9999),
                listing_form(&[("name", "Apa Saja")]),
                &token,
            )
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn deleting_removes_the_row_and_its_images() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let form = listing_form(&[
            ("name", "Tahu Bakso"),
            ("category", "Kuliner"),
            ("description", "Tahu isi bakso"),
        ])
        .part("main_image", image_part("utama.png"))
        .part("additional_images", image_part("satu.png"));
        let created = app
            .post_form_with_token(routes::ADMIN_LISTINGS, form, &token)
            .await;
        assert_eq!(created.status, 201, "{}", created.text);
        let id = created.id();
        let images = refs(&created.body["all_images"]);
        assert_eq!(images.len(), 2);

        let res = app.delete_with_token(&routes::admin_listing(id), &token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["id"], id);
        assert_eq!(res.body["removed_images"], 2);
        assert!(images.iter().all(|r| !app.media_exists(r)));

        let gone = app.get_with_token(&routes::admin_listing(id), &token).await;
        assert_eq!(gone.status, 404);
    }

    #[tokio::test]
    async fn deleted_image_is_not_served_from_a_cached_etag() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let listing = app.create_listing(&token, "Gethuk Lindri", "Kuliner").await;
        let id = listing["id"].as_i64().unwrap() as i32;
        let url = format!("http://{}{}", app.addr, listing["main_image"].as_str().unwrap());

        let first = app.client.get(&url).send().await.unwrap();
        assert_eq!(first.status().as_u16(), 200);
        let etag = first.headers()["etag"].to_str().unwrap().to_string();

        let cached = app
            .client
            .get(&url)
            .header("If-None-Match", &etag)
            .send()
            .await
            .unwrap();
        assert_eq!(cached.status().as_u16(), 304);

        let res = app.delete_with_token(&routes::admin_listing(id), &token).await;
        assert_eq!(res.status, 200, "{}", res.text);

        let stale = app
            .client
            .get(&url)
            .header("If-None-Match", &etag)
            .send()
            .await
            .unwrap();
        assert_eq!(stale.status().as_u16(), 404);
    }

    #[tokio::test]
    async fn deleting_twice_returns_not_found() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let listing = app.create_listing(&token, "Es Dawet", "Kuliner").await;
        let id = listing["id"].as_i64().unwrap() as i32;

        assert_eq!(
            app.delete_with_token(&routes::admin_listing(id), &token)
                .await
                .status,
            200
        );
        assert_eq!(
            app.delete_with_token(&routes::admin_listing(id), &token)
                .await
                .status,
            404
        );
    }
}
